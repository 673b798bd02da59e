//! Cache key construction.
//!
//! Keys are namespaced by the application name: `app:namespace[:object]`.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Builds deterministic cache keys under one application prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuilder {
    app_name: String,
}

impl KeyBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Builds a key from a namespace and an optional discriminator object.
    ///
    /// | object | namespace | key                                  |
    /// |--------|-----------|--------------------------------------|
    /// | some   | non-empty | `app:namespace:json` (or `:hash`)    |
    /// | some   | empty     | `app:json` (or `app:hash`)           |
    /// | none   | non-empty | `app:namespace` (`use_hash` ignored) |
    /// | none   | empty     | empty string                         |
    ///
    /// # Errors
    /// Returns `CacheError::Serialization` if `object` cannot be encoded.
    pub fn prepare_key<T>(&self, namespace: &str, object: Option<&T>, use_hash: bool) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let Some(object) = object else {
            if namespace.is_empty() {
                return Ok(String::new());
            }
            return Ok(format!("{}:{}", self.app_name, namespace));
        };

        let encoded = serde_json::to_string(object).map_err(|err| {
            CacheError::Serialization(format!("cannot encode key object: {}", err))
        })?;
        let suffix = if use_hash { hash(&encoded) } else { encoded };

        if namespace.is_empty() {
            Ok(format!("{}:{}", self.app_name, suffix))
        } else {
            Ok(format!("{}:{}:{}", self.app_name, namespace, suffix))
        }
    }
}

/// Hex-encoded SHA-256 digest of `text`, for shortening keys.
pub fn hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Filter {
        page: u32,
        tag: &'static str,
    }

    const NONE: Option<&Filter> = None;

    #[test]
    fn test_hash_is_fixed_length_hex() {
        let digest = hash("hello");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash("same input"), hash("same input"));
        assert_ne!(hash("input a"), hash("input b"));
    }

    #[test]
    fn test_namespace_and_object() {
        let keys = KeyBuilder::new("shop");
        let filter = Filter { page: 2, tag: "new" };

        let key = keys.prepare_key("products", Some(&filter), false).unwrap();
        assert_eq!(key, r#"shop:products:{"page":2,"tag":"new"}"#);
    }

    #[test]
    fn test_namespace_and_hashed_object() {
        let keys = KeyBuilder::new("shop");
        let filter = Filter { page: 2, tag: "new" };

        let key = keys.prepare_key("products", Some(&filter), true).unwrap();
        assert_eq!(
            key,
            format!("shop:products:{}", hash(r#"{"page":2,"tag":"new"}"#))
        );
    }

    #[test]
    fn test_object_without_namespace() {
        let keys = KeyBuilder::new("shop");

        assert_eq!(keys.prepare_key("", Some(&42), false).unwrap(), "shop:42");
        assert_eq!(
            keys.prepare_key("", Some(&42), true).unwrap(),
            format!("shop:{}", hash("42"))
        );
    }

    #[test]
    fn test_namespace_without_object_ignores_hash() {
        let keys = KeyBuilder::new("shop");

        assert_eq!(keys.prepare_key("products", NONE, false).unwrap(), "shop:products");
        assert_eq!(keys.prepare_key("products", NONE, true).unwrap(), "shop:products");
    }

    #[test]
    fn test_nothing_yields_empty_key() {
        let keys = KeyBuilder::new("shop");
        assert_eq!(keys.prepare_key("", NONE, true).unwrap(), "");
    }

    #[test]
    fn test_empty_app_name() {
        let keys = KeyBuilder::default();
        assert_eq!(keys.prepare_key("products", NONE, false).unwrap(), ":products");
    }

    #[test]
    fn test_unencodable_object_fails() {
        let keys = KeyBuilder::new("shop");
        let mut object = HashMap::new();
        object.insert((1, 2), "tuple keys");

        let result = keys.prepare_key("ns", Some(&object), true);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
