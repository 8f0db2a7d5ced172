//! Placeholder substitution and message composition.
//!
//! Templating is literal string replacement of two tokens; there is no
//! escaping and no other syntax.

use crate::{delivery::OutgoingEmail, recipient::Recipient, variant::Variant};

pub const FIRST_NAME_TOKEN: &str = "{{firstName}}";
pub const HEADLINE_TOKEN: &str = "{{headline}}";

/// Replace every `{{firstName}}` and `{{headline}}` in `body`.
pub fn personalize(body: &str, first_name: &str, headline: &str) -> String {
  body
    .replace(FIRST_NAME_TOKEN, first_name)
    .replace(HEADLINE_TOKEN, headline)
}

/// Who a message goes to.
#[derive(Debug, Clone, Copy)]
pub struct Addressee<'a> {
  pub first_name: &'a str,
  pub email:      &'a str,
}

impl<'a> From<&'a Recipient> for Addressee<'a> {
  fn from(r: &'a Recipient) -> Self {
    Self { first_name: &r.first_name, email: &r.email }
  }
}

/// The parts of a variant that end up in the message.
#[derive(Debug, Clone, Copy)]
pub struct Content<'a> {
  pub subject_line: &'a str,
  pub headline:     &'a str,
  pub body:         &'a str,
}

impl<'a> From<&'a Variant> for Content<'a> {
  fn from(v: &'a Variant) -> Self {
    Self {
      subject_line: &v.subject_line,
      headline:     &v.headline,
      body:         &v.email_body,
    }
  }
}

pub fn compose(from: &str, to: Addressee<'_>, content: Content<'_>) -> OutgoingEmail {
  OutgoingEmail {
    from:    from.to_owned(),
    to:      to.email.to_owned(),
    subject: content.subject_line.to_owned(),
    html:    personalize(content.body, to.first_name, content.headline),
  }
}
