//! Checks run before any write reaches the network.

use crate::error::{RowError, SubscriberError};
use crate::model::{LteSubscription, ServiceState, Subscriber, DEFAULT_AUTH_ALGO};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const INVALID_IMSI: &str = "imsi invalid, should match '^(IMSI\\d{10,15})$'";
pub const DUPLICATE_IMSI: &str = "imsi already exists";
pub const INVALID_AUTH_KEY: &str = "auth key is not a valid hex";
pub const INVALID_AUTH_OPC: &str = "auth opc is not a valid hex";
pub const REQUIRED_AUTH_KEY: &str = "auth key is required";
pub const REQUIRED_SUB_PROFILE: &str = "data plan is required";

fn imsi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(IMSI[0-9]{10,15})$").expect("static IMSI pattern"))
}

pub fn is_valid_imsi(id: &str) -> bool {
    imsi_pattern().is_match(id)
}

pub fn is_valid_hex(value: &str) -> bool {
    !value.is_empty() && value.len() % 2 == 0 && hex::decode(value).is_ok()
}

/// Check id format and uniqueness for a batch of new subscribers.
///
/// `exists` reports whether an id is already in the record store. Every row is
/// checked so all errors are reported together.
pub fn validate_subscribers<F>(batch: &[Subscriber], exists: F) -> Result<(), SubscriberError>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for (row, subscriber) in batch.iter().enumerate() {
        let message = if !is_valid_imsi(&subscriber.id) {
            Some(INVALID_IMSI)
        } else if exists(&subscriber.id) || !seen.insert(subscriber.id.as_str()) {
            Some(DUPLICATE_IMSI)
        } else {
            None
        };

        if let Some(message) = message {
            errors.push(RowError {
                row,
                id: subscriber.id.clone(),
                message: message.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SubscriberError::Validation(errors))
    }
}

/// Subscriber details as an operator enters them, with hex auth material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberForm {
    pub name: String,
    pub imsi: String,
    pub auth_key: String,
    pub auth_opc: String,
    pub state: ServiceState,
    pub data_plan: String,
    pub apns: Vec<String>,
    pub policies: Vec<String>,
}

impl SubscriberForm {
    /// Field checks only; id checks need the store and run in the batch pass.
    fn check_fields(&self) -> Option<&'static str> {
        if self.auth_key.is_empty() {
            return Some(REQUIRED_AUTH_KEY);
        }
        if !is_valid_hex(&self.auth_key) {
            return Some(INVALID_AUTH_KEY);
        }
        if !self.auth_opc.is_empty() && !is_valid_hex(&self.auth_opc) {
            return Some(INVALID_AUTH_OPC);
        }
        if self.data_plan.is_empty() {
            return Some(REQUIRED_SUB_PROFILE);
        }
        None
    }

    fn into_subscriber(self) -> Subscriber {
        let auth_key = hex_to_base64(&self.auth_key).unwrap_or_default();
        let auth_opc = hex_to_base64(&self.auth_opc);
        let name = Some(self.name).filter(|n| !n.is_empty());

        Subscriber {
            id: self.imsi,
            name,
            lte: LteSubscription {
                auth_algo: DEFAULT_AUTH_ALGO.to_string(),
                auth_key,
                auth_opc,
                state: self.state,
                sub_profile: self.data_plan,
            },
            active_apns: self.apns,
            active_policies: self.policies,
            ..Default::default()
        }
    }
}

/// Validate operator input and convert it to wire subscribers.
pub fn subscribers_from_forms<F>(
    forms: Vec<SubscriberForm>,
    exists: F,
) -> Result<Vec<Subscriber>, SubscriberError>
where
    F: Fn(&str) -> bool,
{
    let mut field_errors: Vec<RowError> = forms
        .iter()
        .enumerate()
        .filter_map(|(row, form)| {
            form.check_fields().map(|message| RowError {
                row,
                id: form.imsi.clone(),
                message: message.to_string(),
            })
        })
        .collect();

    let subscribers: Vec<Subscriber> = forms
        .into_iter()
        .map(SubscriberForm::into_subscriber)
        .collect();

    if let Err(SubscriberError::Validation(id_errors)) = validate_subscribers(&subscribers, exists)
    {
        for err in id_errors {
            if !field_errors.iter().any(|e| e.row == err.row) {
                field_errors.push(err);
            }
        }
    }

    if field_errors.is_empty() {
        Ok(subscribers)
    } else {
        field_errors.sort_by_key(|e| e.row);
        Err(SubscriberError::Validation(field_errors))
    }
}

pub fn hex_to_base64(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    hex::decode(value).ok().map(|bytes| STANDARD.encode(bytes))
}

pub fn base64_to_hex(value: &str) -> Option<String> {
    STANDARD.decode(value).ok().map(hex::encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(imsi: &str) -> SubscriberForm {
        SubscriberForm {
            name: "ue".to_string(),
            imsi: imsi.to_string(),
            auth_key: "000102030405060708090a0b0c0d0e0f".to_string(),
            auth_opc: String::new(),
            state: ServiceState::Active,
            data_plan: "default".to_string(),
            apns: vec!["internet".to_string()],
            policies: Vec::new(),
        }
    }

    #[test]
    fn test_imsi_pattern() {
        assert!(is_valid_imsi("IMSI0010100000"));
        assert!(is_valid_imsi("IMSI001011234560000"));
        assert!(!is_valid_imsi("IMSI001"));
        assert!(!is_valid_imsi("IMSI0010112345600001"));
        assert!(!is_valid_imsi("001011234560000"));
        assert!(!is_valid_imsi("IMSI00101123456000a"));
        // Arabic-Indic digits
        let eastern = "IMSI\u{0660}\u{0661}\u{0662}\u{0663}\u{0664}\u{0665}\u{0666}\u{0667}\u{0668}\u{0669}";
        assert!(!is_valid_imsi(eastern));
    }

    #[test]
    fn test_hex() {
        assert!(is_valid_hex("00ff"));
        assert!(!is_valid_hex("0g"));
        assert!(!is_valid_hex("abc"));
        assert!(!is_valid_hex(""));
    }

    #[test]
    fn test_duplicates_in_store_and_batch() {
        let batch = vec![
            Subscriber::new("IMSI001010000000001"),
            Subscriber::new("IMSI001010000000002"),
            Subscriber::new("IMSI001010000000002"),
            Subscriber::new("bogus"),
        ];
        let err = validate_subscribers(&batch, |id| id == "IMSI001010000000001").unwrap_err();
        let rows: Vec<(usize, &str)> = err
            .row_errors()
            .iter()
            .map(|e| (e.row, e.message.as_str()))
            .collect();

        assert_eq!(
            rows,
            vec![(0, DUPLICATE_IMSI), (2, DUPLICATE_IMSI), (3, INVALID_IMSI)]
        );
    }

    #[test]
    fn test_forms_convert_hex_to_base64() {
        let subs = subscribers_from_forms(vec![form("IMSI001010000000001")], |_| false).unwrap();
        let sub = &subs[0];

        assert_eq!(sub.lte.auth_key, "AAECAwQFBgcICQoLDA0ODw==");
        assert_eq!(sub.lte.auth_opc, None);
        assert_eq!(sub.lte.auth_algo, DEFAULT_AUTH_ALGO);
        assert_eq!(sub.lte.state, ServiceState::Active);
        assert_eq!(
            base64_to_hex(&sub.lte.auth_key).as_deref(),
            Some("000102030405060708090a0b0c0d0e0f")
        );
    }

    #[test]
    fn test_forms_report_one_error_per_row() {
        let mut bad_key = form("IMSI001010000000001");
        bad_key.auth_key = "xyz".to_string();
        let mut bad_opc = form("IMSI001");
        bad_opc.auth_opc = "12345".to_string();

        let mut no_key = form("IMSI001010000000004");
        no_key.auth_key = String::new();
        let mut no_plan = form("IMSI001010000000005");
        no_plan.data_plan = String::new();

        let err = subscribers_from_forms(
            vec![bad_key, form("IMSI001010000000003"), bad_opc, no_key, no_plan],
            |_| false,
        )
        .unwrap_err();
        let rows: Vec<(usize, &str)> = err
            .row_errors()
            .iter()
            .map(|e| (e.row, e.message.as_str()))
            .collect();

        assert_eq!(
            rows,
            vec![
                (0, INVALID_AUTH_KEY),
                (2, INVALID_AUTH_OPC),
                (3, REQUIRED_AUTH_KEY),
                (4, REQUIRED_SUB_PROFILE)
            ]
        );
    }
}
