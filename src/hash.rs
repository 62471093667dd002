//! Pluggable key hashing and equality.
//!
//! A table never looks at a key except through its [`KeyOps`]: one call to
//! `hash` per lookup and `equal` against candidates whose cached hash
//! already matches. `hash` and `equal` must agree: equal keys hash equal.

/// Hash/equality pair for keys of type `K`.
pub trait KeyOps<K: ?Sized> {
    fn hash(&self, key: &K) -> u32;
    fn equal(&self, a: &K, b: &K) -> bool;
}

/// Adapts a pair of closures (or plain `fn`s) into [`KeyOps`].
#[derive(Copy, Clone)]
pub struct FnOps<H, E> {
    hash: H,
    equal: E,
}

impl<H, E> FnOps<H, E> {
    pub fn new(hash: H, equal: E) -> Self {
        Self { hash, equal }
    }
}

impl<K, H, E> KeyOps<K> for FnOps<H, E>
where
    K: ?Sized,
    H: Fn(&K) -> u32,
    E: Fn(&K, &K) -> bool,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        (self.equal)(a, b)
    }
}

pub const DJB2_SEED: u32 = 5381;

/// DJB2 in its xor flavour: `h = h * 33 ^ byte`, seeded with 5381.
#[inline]
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |h, &b| {
        (h << 5).wrapping_add(h) ^ u32::from(b)
    })
}

/// Hashes the four in-memory bytes of the integer.
#[inline]
pub fn hash_int32(key: i32) -> u32 {
    djb2(&key.to_ne_bytes())
}

#[inline]
pub fn hash_str(key: &str) -> u32 {
    djb2(key.as_bytes())
}

/// Default ops for `i32` keys.
#[derive(Copy, Clone, Debug, Default)]
pub struct Int32Ops;

impl KeyOps<i32> for Int32Ops {
    #[inline]
    fn hash(&self, key: &i32) -> u32 {
        hash_int32(*key)
    }

    #[inline]
    fn equal(&self, a: &i32, b: &i32) -> bool {
        a == b
    }
}

/// Default ops for string-like keys (`&str`, `String`, byte slices):
/// DJB2 over every byte, byte-wise equality.
#[derive(Copy, Clone, Debug, Default)]
pub struct StrOps;

impl<K: AsRef<[u8]> + ?Sized> KeyOps<K> for StrOps {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        djb2(key.as_ref())
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_reference_values() {
        assert_eq!(djb2(b""), DJB2_SEED);
        assert_eq!(hash_str("a"), 177_604);
        // 5381 * 33^4 mod 2^32; every byte is zero so byte order is irrelevant.
        assert_eq!(hash_int32(0), 2_086_473_605);
    }

    #[test]
    fn str_ops_work_for_owned_and_borrowed() {
        let owned = String::from("key");
        assert_eq!(KeyOps::<String>::hash(&StrOps, &owned), hash_str("key"));
        assert_eq!(KeyOps::<&str>::hash(&StrOps, &"key"), hash_str("key"));
        assert!(KeyOps::<&str>::equal(&StrOps, &"key", &"key"));
        assert!(!KeyOps::<&str>::equal(&StrOps, &"key", &"kez"));
    }

    #[test]
    fn fn_ops_forward_to_closures() {
        let ops = FnOps::new(|k: &u8| u32::from(*k) * 2, |a: &u8, b: &u8| a == b);
        let (a, b) = (21u8, 22u8);
        assert_eq!(KeyOps::<u8>::hash(&ops, &a), 42);
        assert!(KeyOps::<u8>::equal(&ops, &a, &a));
        assert!(!KeyOps::<u8>::equal(&ops, &a, &b));
    }
}
