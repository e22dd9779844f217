//! The contact form boundary: field validation, the JSON request body sent
//! to the contact endpoint, and the notice shown once the single attempt
//! resolves. Issuing the request itself is left to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONTACT_ENDPOINT: &str = "/api/contact";

// Lengths are counted in UTF-16 code units, like a browser's `String.length`.
const MIN_NAME_UNITS: usize = 2;
const MIN_MESSAGE_UNITS: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
  pub name: String,
  pub email: String,
  pub message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
  Name,
  Email,
  Message,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{field:?}: {message}")]
pub struct FieldIssue {
  pub field: ContactField,
  pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum ContactError {
  #[error("form has {} invalid field(s)", .0.len())]
  Invalid(Vec<FieldIssue>),

  #[error("a submission is already in flight")]
  InFlight,

  #[error("no submission is in flight")]
  NotSubmitted,

  #[error("failed to encode request body: {0}")]
  Encode(#[from] serde_json::Error),
}

impl ContactForm {
  pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      email: email.into(),
      message: message.into(),
    }
  }

  /// Collects every failing field rather than stopping at the first.
  pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
    let mut issues = Vec::new();
    if self.name.encode_utf16().count() < MIN_NAME_UNITS {
      issues.push(FieldIssue {
        field: ContactField::Name,
        message: "Name must be at least 2 characters",
      });
    }
    if !is_valid_email(&self.email) {
      issues.push(FieldIssue {
        field: ContactField::Email,
        message: "Please enter a valid email address",
      });
    }
    if self.message.encode_utf16().count() < MIN_MESSAGE_UNITS {
      issues.push(FieldIssue {
        field: ContactField::Message,
        message: "Message must be at least 10 characters",
      });
    }
    if issues.is_empty() {
      Ok(())
    } else {
      Err(issues)
    }
  }

  /// JSON body for a POST to [`CONTACT_ENDPOINT`]. Invalid forms never produce one.
  pub fn request_body(&self) -> Result<String, ContactError> {
    self.validate().map_err(ContactError::Invalid)?;
    Ok(serde_json::to_string(self)?)
  }
}

/// `local@label.label.tld`: the local part may hold letters, digits and
/// `_ ' + - .` but cannot start with a dot or end with a dot or quote; domain
/// labels start with a letter or digit; the tld is at least two letters; no
/// `..` anywhere.
pub fn is_valid_email(email: &str) -> bool {
  if email.contains("..") {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };

  let local_ok = !local.is_empty()
    && !local.starts_with('.')
    && local
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '-' | '.'))
    && local
      .chars()
      .last()
      .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
  if !local_ok {
    return false;
  }

  let labels: Vec<&str> = domain.split('.').collect();
  let Some((tld, rest)) = labels.split_last() else {
    return false;
  };
  if rest.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
    return false;
  }
  rest.iter().all(|label| {
    let mut chars = label.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
      && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
  })
}

/// Toast shown when a submission resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
  pub title: &'static str,
  pub description: &'static str,
  pub destructive: bool,
}

/// One attempt per submission; a failure is reported, never retried.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
  #[default]
  Idle,
  Pending,
  Sent,
  Failed,
}

impl SubmissionState {
  /// Validates the form and moves to `Pending`, returning the body to send.
  pub fn submit(&mut self, form: &ContactForm) -> Result<String, ContactError> {
    if *self == Self::Pending {
      return Err(ContactError::InFlight);
    }
    let body = form.request_body()?;
    *self = Self::Pending;
    Ok(body)
  }

  pub fn finish(&mut self, delivered: bool) -> Result<Notice, ContactError> {
    if *self != Self::Pending {
      return Err(ContactError::NotSubmitted);
    }
    if delivered {
      *self = Self::Sent;
      Ok(Notice {
        title: "Message sent!",
        description: "Thanks for reaching out. I'll get back to you soon.",
        destructive: false,
      })
    } else {
      *self = Self::Failed;
      Ok(Notice {
        title: "Error",
        description: "Something went wrong. Please try again.",
        destructive: true,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid() -> ContactForm {
    ContactForm::new("Ada", "ada@example.com", "Let's build something neon.")
  }

  #[test]
  fn valid_form_passes() {
    assert_eq!(valid().validate(), Ok(()));
  }

  #[test]
  fn every_bad_field_is_reported() {
    let form = ContactForm::new("A", "not-an-email", "too short");
    let issues = form.validate().unwrap_err();
    let fields: Vec<ContactField> = issues.iter().map(|i| i.field).collect();
    assert_eq!(fields, vec![ContactField::Name, ContactField::Email, ContactField::Message]);
    assert_eq!(issues[0].message, "Name must be at least 2 characters");
  }

  #[test]
  fn length_limits_are_inclusive() {
    let form = ContactForm::new("Al", "al@example.io", "0123456789");
    assert_eq!(form.validate(), Ok(()));
  }

  #[test]
  fn lengths_count_utf16_units() {
    // One astral-plane emoji is two code units.
    let form = ContactForm::new("\u{1F680}", "ada@example.com", "0123456789");
    assert_eq!(form.validate(), Ok(()));

    let form = ContactForm::new("\u{e9}", "ada@example.com", "\u{e9}".repeat(9));
    let fields: Vec<ContactField> = form.validate().unwrap_err().iter().map(|i| i.field).collect();
    assert_eq!(fields, vec![ContactField::Name, ContactField::Message]);
  }

  #[test]
  fn email_shapes() {
    for good in ["a@b.co", "first.last+tag@mail.example.org", "o'neil_1@x-y.com"] {
      assert!(is_valid_email(good), "{good} rejected");
    }
    for bad in [
      "",
      "plain",
      "@example.com",
      ".dot@example.com",
      "dot.@example.com",
      "two..dots@example.com",
      "a@localhost",
      "a@example.c",
      "a@example.c0m",
      "a@-bad.com",
      "a b@example.com",
      "a@b@example.com",
    ] {
      assert!(!is_valid_email(bad), "{bad} accepted");
    }
  }

  #[test]
  fn request_body_is_the_form_as_json() {
    let body = valid().request_body().unwrap();
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["name"], "Ada");
    assert_eq!(value["email"], "ada@example.com");
    assert_eq!(value["message"], "Let's build something neon.");
    assert_eq!(value.as_object().unwrap().len(), 3);
  }

  #[test]
  fn invalid_form_has_no_body() {
    let err = ContactForm::default().request_body().unwrap_err();
    assert!(matches!(err, ContactError::Invalid(issues) if issues.len() == 3));
  }

  #[test]
  fn single_attempt_per_submission() {
    let mut state = SubmissionState::default();
    state.submit(&valid()).unwrap();
    assert_eq!(state, SubmissionState::Pending);
    assert!(matches!(state.submit(&valid()), Err(ContactError::InFlight)));

    let notice = state.finish(false).unwrap();
    assert_eq!(state, SubmissionState::Failed);
    assert!(notice.destructive);
    assert!(matches!(state.finish(true), Err(ContactError::NotSubmitted)));

    state.submit(&valid()).unwrap();
    let notice = state.finish(true).unwrap();
    assert_eq!(state, SubmissionState::Sent);
    assert_eq!(notice.title, "Message sent!");
  }

  #[test]
  fn invalid_submission_stays_idle() {
    let mut state = SubmissionState::default();
    assert!(state.submit(&ContactForm::default()).is_err());
    assert_eq!(state, SubmissionState::Idle);
  }
}
