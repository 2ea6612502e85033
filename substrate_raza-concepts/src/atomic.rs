use core::sync::atomic::{AtomicU64, Ordering};

/// Floating point value which can be shared and modified between threads.
///
/// The value is stored as its bit pattern inside an [AtomicU64].
/// Additions are performed with a compare-and-swap loop and are thus lock-free.
/// ```
/// # use substrate_raza_concepts::AtomicF64;
/// # use core::sync::atomic::Ordering;
/// let value = AtomicF64::new(1.5);
/// let previous = value.fetch_add(2.0, Ordering::Relaxed);
/// assert_eq!(previous, 1.5);
/// assert_eq!(value.load(Ordering::Relaxed), 3.5);
/// ```
#[repr(transparent)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Creates a new atomic float
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Loads the current value
    #[inline]
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    /// Overwrites the current value
    #[inline]
    pub fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }

    /// Stores a new value and returns the previous one
    #[inline]
    pub fn swap(&self, value: f64, order: Ordering) -> f64 {
        f64::from_bits(self.0.swap(value.to_bits(), order))
    }

    /// Adds to the current value and returns the previous value.
    #[inline]
    pub fn fetch_add(&self, value: f64, order: Ordering) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, new, order, Ordering::Relaxed)
            {
                Ok(previous) => return f64::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }

    /// Subtracts from the current value and returns the previous value.
    #[inline]
    pub fn fetch_sub(&self, value: f64, order: Ordering) -> f64 {
        self.fetch_add(-value, order)
    }

    /// Consumes the atomic and returns the contained value.
    pub fn into_inner(self) -> f64 {
        f64::from_bits(self.0.into_inner())
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicF64 {
    fn clone(&self) -> Self {
        Self::new(self.load(Ordering::Relaxed))
    }
}

impl From<f64> for AtomicF64 {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Debug for AtomicF64 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.load(Ordering::Relaxed).fmt(f)
    }
}

impl serde::Serialize for AtomicF64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.load(Ordering::Relaxed))
    }
}

impl<'de> serde::Deserialize<'de> for AtomicF64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::new(f64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod test_atomic_f64 {
    use super::*;

    #[test]
    fn new_preserves_bits() {
        for value in [0.0, -0.0, 1.0, -3.25, 1e-300, f64::MAX] {
            assert_eq!(AtomicF64::new(value).into_inner().to_bits(), value.to_bits());
        }
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        use rayon::prelude::*;
        let value = AtomicF64::new(0.0);
        (0..10_000).into_par_iter().for_each(|_| {
            value.fetch_add(0.5, Ordering::Relaxed);
        });
        assert_eq!(value.load(Ordering::Relaxed), 5_000.0);
    }
}
