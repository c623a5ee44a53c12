//! Remapping of identity claim URNs (WS-Federation, SOAP) onto short names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CLAIM_NAMES: &[(&str, &str)] = &[
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
        "name",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
        "id",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
        "email",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
        "givenName",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
        "surname",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/mobilephone",
        "phone",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/streetaddress",
        "address",
    ),
    (
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
        "role",
    ),
];

/// Short name of a claim.
///
/// Known URNs map through the table, other URNs keep their last path segment
/// and plain names pass through untouched.
pub fn short_claim_name(claim: &str) -> &str {
    if let Some((_, short)) = CLAIM_NAMES.iter().find(|(long, _)| *long == claim) {
        return *short;
    }

    if claim.contains("/claims/") {
        return claim.rsplit('/').next().unwrap_or(claim);
    }

    claim
}

/// Remaps every key of a claims object, later duplicates win.
pub fn remap_claims(claims: &Map<String, Value>) -> Map<String, Value> {
    claims
        .iter()
        .map(|(key, value)| (short_claim_name(key).to_string(), value.clone()))
        .collect()
}

/// The part of the claims the storefront works with.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let claims = remap_claims(claims);
        let text = |key: &str| claims.get(key).and_then(|v| v.as_str()).map(String::from);

        let roles = match claims.get("role") {
            Some(Value::String(role)) => vec![role.clone()],
            Some(Value::Array(roles)) => roles
                .iter()
                .filter_map(|r| r.as_str().map(String::from))
                .collect(),
            _ => vec![],
        };

        Identity {
            id: text("id"),
            name: text("name"),
            email: text("email"),
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::claims::{Identity, remap_claims, short_claim_name};
    use serde_json::json;

    #[test]
    fn known_urns() {
        assert_eq!(
            short_claim_name("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress"),
            "email"
        );
        assert_eq!(
            short_claim_name("http://schemas.microsoft.com/ws/2008/06/identity/claims/role"),
            "role"
        );
    }

    #[test]
    fn unknown_urn_and_plain() {
        assert_eq!(
            short_claim_name("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/country"),
            "country"
        );
        assert_eq!(short_claim_name("exp"), "exp");
    }

    #[test]
    fn remap_object() {
        let claims = json!({
            "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name": "anna",
            "exp": 1700000000
        });
        let remapped = remap_claims(claims.as_object().unwrap());
        assert_eq!(remapped.get("name"), Some(&json!("anna")));
        assert_eq!(remapped.get("exp"), Some(&json!(1700000000)));
    }

    #[test]
    fn identity() {
        let claims = json!({
            "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier": "42",
            "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name": "anna",
            "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": ["Customer", "Admin"]
        });
        let identity = Identity::from_claims(claims.as_object().unwrap());

        assert_eq!(identity.id.as_deref(), Some("42"));
        assert_eq!(identity.name.as_deref(), Some("anna"));
        assert_eq!(identity.email, None);
        assert_eq!(identity.roles, vec!["Customer", "Admin"]);
    }

    #[test]
    fn single_role() {
        let claims = json!({"role": "Customer"});
        let identity = Identity::from_claims(claims.as_object().unwrap());
        assert_eq!(identity.roles, vec!["Customer"]);
    }
}
