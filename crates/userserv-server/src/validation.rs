//! Request body validation for the HTTP boundary.
//!
//! Rules mirror the payload constraints of the record store columns: names and
//! numbers must fit their columns, emails must be well formed, birth dates lie
//! in the past and expiration dates in the future.

use std::sync::LazyLock;

use regex::Regex;
use time::{Date, OffsetDateTime};
use userserv_core::{CardPatch, NewCard, NewPrincipal, PrincipalPatch};

use crate::error::ServiceError;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ServiceError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_not_blank(field: &str, value: &str, max: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{field} must not be blank")));
    }
    if value.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ServiceError> {
    check_not_blank("email", email, 64)?;
    let well_formed = EMAIL
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email));
    if !well_formed {
        return Err(ServiceError::validation("email must be a well-formed email address"));
    }
    Ok(())
}

fn check_birth_date(date: Date) -> Result<(), ServiceError> {
    if date >= today() {
        return Err(ServiceError::validation("birthDate must be in the past"));
    }
    Ok(())
}

fn check_expiration_date(date: Date) -> Result<(), ServiceError> {
    if date <= today() {
        return Err(ServiceError::validation("expirationDate must be in the future"));
    }
    Ok(())
}

pub fn validate_new_principal(new: &NewPrincipal) -> Result<(), ServiceError> {
    check_length("name", &new.name, 2, 32)?;
    check_length("surname", &new.surname, 2, 64)?;
    check_email(&new.email)?;
    check_birth_date(new.birth_date)
}

/// Same rules as creation, applied to the fields that are present.
pub fn validate_principal_patch(patch: &PrincipalPatch) -> Result<(), ServiceError> {
    if let Some(name) = &patch.name {
        check_length("name", name, 2, 32)?;
    }
    if let Some(surname) = &patch.surname {
        check_length("surname", surname, 2, 64)?;
    }
    if let Some(email) = &patch.email {
        check_email(email)?;
    }
    if let Some(birth_date) = patch.birth_date {
        check_birth_date(birth_date)?;
    }
    Ok(())
}

pub fn validate_new_card(new: &NewCard) -> Result<(), ServiceError> {
    check_not_blank("number", &new.number, 32)?;
    check_not_blank("holder", &new.holder, 32)?;
    check_expiration_date(new.expiration_date)
}

pub fn validate_card_patch(patch: &CardPatch) -> Result<(), ServiceError> {
    if let Some(number) = &patch.number {
        check_not_blank("number", number, 32)?;
    }
    if let Some(holder) = &patch.holder {
        check_not_blank("holder", holder, 32)?;
    }
    if let Some(expiration_date) = patch.expiration_date {
        check_expiration_date(expiration_date)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::date;
    use userserv_core::PrincipalId;

    fn principal() -> NewPrincipal {
        NewPrincipal {
            name: "Ann".to_string(),
            surname: "Lee".to_string(),
            birth_date: date!(1990 - 05 - 17),
            email: "ann@example.com".to_string(),
        }
    }

    fn card() -> NewCard {
        NewCard {
            number: "4242424242424242".to_string(),
            holder: "ANN LEE".to_string(),
            expiration_date: today() + Duration::days(365),
            owner_id: PrincipalId::generate(),
        }
    }

    #[test]
    fn test_valid_payloads_pass() {
        assert!(validate_new_principal(&principal()).is_ok());
        assert!(validate_new_card(&card()).is_ok());
        assert!(validate_principal_patch(&PrincipalPatch::default()).is_ok());
        assert!(validate_card_patch(&CardPatch::default()).is_ok());
    }

    #[test]
    fn test_principal_rules() {
        let mut p = principal();
        p.name = "A".to_string();
        assert!(validate_new_principal(&p).is_err());

        let mut p = principal();
        p.surname = "x".repeat(65);
        assert!(validate_new_principal(&p).is_err());

        let mut p = principal();
        p.email = "not-an-email".to_string();
        assert!(validate_new_principal(&p).is_err());

        let mut p = principal();
        p.email = format!("{}@x.com", "a".repeat(60));
        assert!(validate_new_principal(&p).is_err());

        let mut p = principal();
        p.birth_date = today();
        assert!(validate_new_principal(&p).is_err());
    }

    #[test]
    fn test_card_rules() {
        let mut c = card();
        c.number = "   ".to_string();
        assert!(validate_new_card(&c).is_err());

        let mut c = card();
        c.holder = "x".repeat(33);
        assert!(validate_new_card(&c).is_err());

        let mut c = card();
        c.expiration_date = today() - Duration::days(1);
        assert!(validate_new_card(&c).is_err());
    }

    #[test]
    fn test_patches_check_present_fields_only() {
        let patch = PrincipalPatch {
            email: Some("broken".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_principal_patch(&patch),
            Err(ServiceError::Validation { .. })
        ));

        let patch = CardPatch {
            holder: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_card_patch(&patch).is_err());
    }
}
