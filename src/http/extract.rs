//! Shared request-field helpers.

use alloy::primitives::Address;

use crate::http::error::{ApiError, ApiResult};
use crate::store::{Store, User};

/// A trimmed, non-empty field, or 400 `<name> is required`.
pub fn required<'a>(name: &str, value: Option<&'a str>) -> ApiResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{} is required", name))),
    }
}

pub fn parse_address(name: &str, value: &str) -> ApiResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{} is not a valid address: '{}'", name, value)))
}

/// Find a user by id, email or wallet address, or 404.
pub async fn lookup_user(store: &Store, key: &str) -> ApiResult<User> {
    store
        .resolve_user(key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no user matches '{}'", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required("email", Some(" a@b.c ")).unwrap(), "a@b.c");
        let err = required("email", Some("  ")).unwrap_err();
        assert_eq!(err.to_string(), "email is required");
        assert!(required("password", None).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("to", "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").is_ok());
        let err = parse_address("to", "0x12").unwrap_err();
        assert!(err.to_string().starts_with("to is not a valid address"));
    }

    #[tokio::test]
    async fn test_lookup_user() {
        let (store, users) =
            crate::store::test_support::store_with_users(&["a@x.io"], &[]).await;
        let by_email = lookup_user(&store, "a@x.io").await.unwrap();
        assert_eq!(by_email.id, users[0].id);
        let by_address = lookup_user(&store, &users[0].wallet_address).await.unwrap();
        assert_eq!(by_address.id, users[0].id);
        assert!(matches!(
            lookup_user(&store, "nobody@x.io").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
