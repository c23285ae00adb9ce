//! Cache key construction.
//!
//! A key is `prefix:operation:<positional...>:<name:value...>` with keyword
//! arguments sorted by name. Connection or session handles never take part:
//! callers pass only the arguments that identify the data.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

/// Separator between key segments.
pub const KEY_DELIMITER: &str = ":";

/// Canonical, locale-independent string form of a key argument.
pub trait KeyPart {
    fn key_part(&self) -> String;
}

macro_rules! display_key_part {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyPart for $ty {
                fn key_part(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_key_part!(i8, i16, i32, i64, u8, u16, u32, u64, usize, bool, str, String);

impl KeyPart for ObjectId {
    fn key_part(&self) -> String {
        self.to_hex()
    }
}

impl KeyPart for NaiveDate {
    fn key_part(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn key_part(&self) -> String {
        (**self).key_part()
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn key_part(&self) -> String {
        match self {
            Some(value) => value.key_part(),
            None => "none".to_string(),
        }
    }
}

/// The identifying arguments of one cached call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyArgs {
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

impl KeyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl KeyPart) -> Self {
        self.positional.push(value.key_part());
        self
    }

    /// Set a keyword argument. Order of calls does not matter.
    #[must_use]
    pub fn kwarg(mut self, name: &str, value: impl KeyPart) -> Self {
        self.keyword.insert(name.to_string(), value.key_part());
        self
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keyword.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Argument types that can be turned into [`KeyArgs`].
pub trait CacheArgs {
    fn key_args(&self) -> KeyArgs;
}

impl CacheArgs for KeyArgs {
    fn key_args(&self) -> KeyArgs {
        self.clone()
    }
}

/// Build the default cache key for a call.
pub fn build_key(prefix: &str, operation: &str, args: &KeyArgs) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(2 + args.positional.len() + args.keyword.len());
    parts.push(prefix.to_string());
    parts.push(operation.to_string());
    parts.extend(args.positional.iter().cloned());
    parts.extend(args.keyword().map(|(name, value)| format!("{name}:{value}")));
    parts.join(KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_then_sorted_keywords() {
        let args = KeyArgs::new()
            .arg(42_i64)
            .arg(2024)
            .kwarg("limit", 5_u32)
            .kwarg("desc", true);

        assert_eq!(
            build_key("last_expenses", "get_last_expenses", &args),
            "last_expenses:get_last_expenses:42:2024:desc:true:limit:5"
        );
    }

    #[test]
    fn test_same_logical_call_same_key() {
        let a = KeyArgs::new().arg(7_i64).kwarg("b", 1).kwarg("a", 2);
        let b = KeyArgs::new().arg(7_i64).kwarg("a", 2).kwarg("b", 1);
        assert_eq!(build_key("p", "op", &a), build_key("p", "op", &b));
    }

    #[test]
    fn test_distinct_arguments_distinct_keys() {
        let a = KeyArgs::new().arg(1_i64).arg(12);
        let b = KeyArgs::new().arg(11_i64).arg(2);
        assert_ne!(build_key("p", "op", &a), build_key("p", "op", &b));
    }

    #[test]
    fn test_no_arguments() {
        assert_eq!(build_key("p", "op", &KeyArgs::new()), "p:op");
    }

    #[test]
    fn test_canonical_forms() {
        let oid = ObjectId::parse_str("65f0c0ffee0000000000beef").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let args = KeyArgs::new()
            .arg(oid)
            .arg(date)
            .arg(None::<i32>)
            .arg(Some("x"))
            .arg(-3_i32);
        assert_eq!(
            args.positional(),
            &["65f0c0ffee0000000000beef", "2024-03-07", "none", "x", "-3"]
        );
    }
}
