use serde::{Deserialize, Serialize};

use fleetrent_core::{CustomerId, DomainResult, Entity, FieldErrors};

/// A customer record as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Customer {
    /// "Last First", the label used in rental pickers and listings.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Case-insensitive match of `term` against names and email.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&self.last_name, &self.first_name, &self.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Merge `patch` into this record, returning the validated result.
    ///
    /// The identifier never changes; absent patch fields keep their value.
    pub fn patched(&self, patch: &CustomerPatch) -> DomainResult<Customer> {
        let merged = NewCustomer {
            last_name: patch.last_name.clone().unwrap_or_else(|| self.last_name.clone()),
            first_name: patch.first_name.clone().unwrap_or_else(|| self.first_name.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            phone: patch.phone.clone().unwrap_or_else(|| self.phone.clone()),
        }
        .validated()?;

        Ok(merged.into_customer(self.id))
    }
}

/// Input for creating a customer (identifier assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

impl NewCustomer {
    /// Check every field and return a trimmed copy.
    ///
    /// All four fields are required; the email must look like
    /// `local@domain.tld`.
    pub fn validated(self) -> DomainResult<NewCustomer> {
        let candidate = NewCustomer {
            last_name: self.last_name.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        errors.require("last_name", &candidate.last_name);
        errors.require("first_name", &candidate.first_name);
        if candidate.email.is_empty() {
            errors.push("email", "is required");
        } else if !is_valid_email(&candidate.email) {
            errors.push("email", "is not a valid address");
        }
        errors.require("phone", &candidate.phone);
        errors.into_result()?;

        Ok(candidate)
    }

    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            last_name: self.last_name,
            first_name: self.first_name,
            email: self.email,
            phone: self.phone,
        }
    }
}

/// Partial update of a customer; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `non-space @ non-space . non-space`, with no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    // The domain needs a dot with something on both sides of it.
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetrent_core::DomainError;

    fn new_customer() -> NewCustomer {
        NewCustomer {
            last_name: "Durand".to_string(),
            first_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+33 6 12 34 56 78".to_string(),
        }
    }

    #[test]
    fn validated_trims_every_field() {
        let input = NewCustomer {
            last_name: "  Durand ".to_string(),
            first_name: "Alice\n".to_string(),
            email: " alice@example.com".to_string(),
            phone: " 0612 ".to_string(),
        };

        let valid = input.validated().unwrap();
        assert_eq!(valid.last_name, "Durand");
        assert_eq!(valid.first_name, "Alice");
        assert_eq!(valid.email, "alice@example.com");
        assert_eq!(valid.phone, "0612");
    }

    #[test]
    fn validated_reports_all_missing_fields() {
        let input = NewCustomer {
            last_name: " ".to_string(),
            first_name: String::new(),
            email: String::new(),
            phone: "0612".to_string(),
        };

        let err = input.validated().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "last_name is required; first_name is required; email is required"
            )
        );
    }

    #[test]
    fn validated_rejects_malformed_email() {
        let mut input = new_customer();
        input.email = "alice.example.com".to_string();

        match input.validated() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("email")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.c"));
        assert!(!is_valid_email("a@.c"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[test]
    fn patched_keeps_identity_and_unpatched_fields() {
        let customer = new_customer().validated().unwrap().into_customer(CustomerId::new());
        let patch = CustomerPatch {
            phone: Some(" 0700 ".to_string()),
            ..CustomerPatch::default()
        };

        let updated = customer.patched(&patch).unwrap();
        assert_eq!(updated.id, customer.id);
        assert_eq!(updated.last_name, "Durand");
        assert_eq!(updated.phone, "0700");
    }

    #[test]
    fn patched_rejects_blanking_a_required_field() {
        let customer = new_customer().into_customer(CustomerId::new());
        let patch = CustomerPatch {
            first_name: Some("   ".to_string()),
            ..CustomerPatch::default()
        };

        assert!(matches!(customer.patched(&patch), Err(DomainError::Validation(_))));
    }

    #[test]
    fn matches_is_case_insensitive_and_empty_term_matches_all() {
        let customer = new_customer().into_customer(CustomerId::new());
        assert!(customer.matches("durAND"));
        assert!(customer.matches("example"));
        assert!(customer.matches("  "));
        assert!(!customer.matches("martin"));
        assert_eq!(customer.display_name(), "Durand Alice");
    }

    #[test]
    fn patch_deserializes_with_missing_fields() {
        let patch: CustomerPatch = serde_json::from_str(r#"{"email":"x@y.z"}"#).unwrap();
        assert_eq!(patch.email.as_deref(), Some("x@y.z"));
        assert!(patch.last_name.is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            #[test]
            fn emails_with_whitespace_are_always_rejected(
                local in "[a-z]{1,8}",
                domain in "[a-z]{1,8}",
                pad in "[ \t]{1,3}",
            ) {
                let email = format!("{local}{pad}@{domain}.com");
                prop_assert!(!is_valid_email(&email));
            }

            #[test]
            fn well_formed_emails_are_accepted(
                local in "[a-z0-9.]{1,12}",
                domain in "[a-z0-9]{1,12}",
                tld in "[a-z]{2,4}",
            ) {
                let email = format!("{local}@{domain}.{tld}");
                prop_assert!(is_valid_email(&email));
            }
        }
    }
}
