use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, FieldErrors, UserId};

pub const EMAIL_MAX_LEN: usize = 120;
pub const NAME_MAX_LEN: usize = 50;

/// Profile details supplied when a caller registers their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial profile edit. Email is owned by the identity provider and cannot
/// be changed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

/// Flat, storage-facing view of a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A storefront user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Register the profile of an authenticated identity.
    ///
    /// The email is trimmed and lowercased so uniqueness is case-insensitive.
    pub fn register(id: UserId, input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let user = Self {
            id,
            email: input.email.trim().to_lowercase(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            active: record.active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        if self.email.is_empty() {
            errors.add("email", "Email is required");
        } else if self.email.chars().count() > EMAIL_MAX_LEN {
            errors.add("email", format!("Email must be at most {EMAIL_MAX_LEN} characters"));
        } else if !is_plausible_email(&self.email) {
            errors.add("email", "Invalid email format");
        }

        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);

        errors.into_result()
    }

    /// Apply a partial profile edit. Nothing changes unless the result is valid.
    pub fn update_profile(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if update.is_empty() {
            return Err(DomainError::validation("update", "no fields to update"));
        }

        let mut candidate = self.clone();
        if let Some(first_name) = update.first_name {
            candidate.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            candidate.last_name = last_name.trim().to_string();
        }
        candidate.validate()?;

        candidate.updated_at = now;
        *self = candidate;
        Ok(())
    }

    /// Soft delete.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::business_rule("user is already inactive"));
        }
        self.active = false;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn check_name(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if value.chars().count() > NAME_MAX_LEN {
        errors.add(field, format!("{label} must be at most {NAME_MAX_LEN} characters"));
    }
}

/// `local@domain.tld` with no whitespace and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && !host.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_user() -> NewUser {
        NewUser {
            email: "  Alice@Example.com ".to_string(),
            first_name: " Alice ".to_string(),
            last_name: "Liddell".to_string(),
        }
    }

    #[test]
    fn register_normalizes_email_and_names() {
        let id = UserId::new();
        let user = User::register(id, new_user(), test_time()).unwrap();
        assert_eq!(user.id_typed(), id);
        assert_eq!(user.email(), "alice@example.com");
        assert_eq!(user.first_name(), "Alice");
        assert_eq!(user.full_name(), "Alice Liddell");
        assert!(user.is_active());
    }

    #[test]
    fn register_collects_all_field_errors() {
        let input = NewUser {
            email: "not-an-email".to_string(),
            first_name: "   ".to_string(),
            last_name: "x".repeat(NAME_MAX_LEN + 1),
        };
        match User::register(UserId::new(), input, test_time()).unwrap_err() {
            DomainError::Validation(errors) => {
                assert_eq!(errors.get("email"), Some("Invalid email format"));
                assert_eq!(errors.get("first_name"), Some("First name is required"));
                assert!(errors.get("last_name").is_some());
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_format_checks() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org"] {
            assert!(is_plausible_email(ok), "{ok}");
        }
        for bad in ["", "@b.co", "a@", "a@b", "a@b.c", "a@@b.co", "a b@c.co", "a@.co"] {
            assert!(!is_plausible_email(bad), "{bad}");
        }
    }

    #[test]
    fn profile_update_applies_only_present_fields() {
        let mut user = User::register(UserId::new(), new_user(), test_time()).unwrap();
        let later = user.updated_at() + chrono::Duration::seconds(5);

        user.update_profile(
            ProfileUpdate {
                last_name: Some(" Pleasance ".to_string()),
                ..Default::default()
            },
            later,
        )
        .unwrap();

        assert_eq!(user.last_name(), "Pleasance");
        assert_eq!(user.first_name(), "Alice");
        assert_eq!(user.updated_at(), later);
    }

    #[test]
    fn invalid_or_empty_update_leaves_profile_untouched() {
        let mut user = User::register(UserId::new(), new_user(), test_time()).unwrap();
        let before = user.clone();

        assert!(matches!(
            user.update_profile(
                ProfileUpdate {
                    first_name: Some(String::new()),
                    last_name: Some("Ok".to_string()),
                },
                test_time(),
            ),
            Err(DomainError::Validation(_))
        ));
        assert!(user.update_profile(ProfileUpdate::default(), test_time()).is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn email_is_not_part_of_a_profile_update() {
        let parsed: Result<ProfileUpdate, _> =
            serde_json::from_str(r#"{"email":"mallory@example.com"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn deactivate_is_a_soft_delete() {
        let mut user = User::register(UserId::new(), new_user(), test_time()).unwrap();
        user.deactivate(test_time()).unwrap();
        assert!(!user.is_active());
        assert!(matches!(
            user.deactivate(test_time()),
            Err(DomainError::BusinessRule(_))
        ));
    }

    #[test]
    fn record_round_trip_preserves_state() {
        let user = User::register(UserId::new(), new_user(), test_time()).unwrap();
        assert_eq!(User::from_record(user.to_record()), user);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: registration either succeeds with a well-formed email or
            /// reports field errors; it never panics on arbitrary input.
            #[test]
            fn register_never_panics(email in ".{0,140}", first in ".{0,60}", last in ".{0,60}") {
                let input = NewUser { email, first_name: first, last_name: last };
                match User::register(UserId::new(), input, Utc::now()) {
                    Ok(user) => {
                        prop_assert!(user.email().contains('@'));
                        prop_assert!(!user.email().chars().any(char::is_whitespace));
                    }
                    Err(err) => prop_assert!(matches!(err, DomainError::Validation(_))),
                }
            }
        }
    }
}
