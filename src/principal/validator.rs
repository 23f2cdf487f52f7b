//! Checks that a principal email names an identity usable with PLAIN.
//!
//! Accepted:
//! - RFC 5322 mailboxes (user and service account emails)
//! - `principal://iam.googleapis.com/...` identifiers of a federation pool subject
//!
//! Rejected:
//! - bare Workload Identity pool names (`<project>.svc.id.goog`)
//! - any other `principal://iam.googleapis.com` identifier

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

const WIF_POOL_SUFFIX: &str = ".svc.id.goog";
const FEDERATION_PRINCIPAL_PREFIX: &str = "principal://iam.googleapis.com";

// principal://iam.googleapis.com/.../(workloadIdentityPools|workforcePools)/<pool>/subject/<subject>
static POOL_SUBJECT_PRINCIPAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^principal://iam\.googleapis\.com/(?:[^/]+/)*(?:workloadIdentityPools|workforcePools)/[^/]+/subject/.+$")
        .expect("pool subject pattern compiles")
});

// addr-spec: (dot-atom / quoted-string) "@" (dot-atom / domain-literal)
static ADDR_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    let atext = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~\-[^\x00-\x7F]]";
    let dot_atom = format!(r"{atext}+(?:\.{atext}+)*");
    let quoted = r#""(?:[^"\\\r\n]|\\.)*""#;
    let literal = r"\[[^\[\]\\\s]*\]";
    Regex::new(&format!(r"^(?:{dot_atom}|{quoted})@(?:{dot_atom}|{literal})$"))
        .expect("addr-spec pattern compiles")
});

/// Validate a principal email, see the module docs for the accepted shapes.
pub fn validate_principal_email(email: &str) -> Result<(), ValidationError> {
    if POOL_SUBJECT_PRINCIPAL.is_match(email) {
        return Ok(());
    }
    if email.ends_with(WIF_POOL_SUFFIX) || email.starts_with(FEDERATION_PRINCIPAL_PREFIX) {
        return Err(ValidationError::UnsupportedIdentityType(email.to_owned()));
    }
    parse_mailbox(email)
        .map(|_| ())
        .map_err(|reason| ValidationError::MalformedAddress {
            address: email.to_owned(),
            reason: reason.to_owned(),
        })
}

/// Parse `addr-spec` or `display-name <addr-spec>`, returning the addr-spec.
fn parse_mailbox(input: &str) -> Result<&str, &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Err("no address");
    }

    let addr = match input.strip_suffix('>') {
        Some(rest) => {
            let open = rest.rfind('<').ok_or("unclosed angle-addr")?;
            let display_name = &rest[..open];
            if !quotes_balanced(display_name) {
                return Err("unclosed quoted-string in display name");
            }
            if display_name.contains(['<', '>', '@']) {
                return Err("invalid display name");
            }
            rest[open + 1..].trim()
        }
        None => input,
    };

    if !addr.contains('@') {
        return Err("missing @ in addr-spec");
    }
    if !ADDR_SPEC.is_match(addr) {
        return Err("invalid addr-spec");
    }
    Ok(addr)
}

// every quoted-string in the phrase must be closed; `\"` is an escape
fn quotes_balanced(phrase: &str) -> bool {
    let mut quoted = false;
    let mut escaped = false;
    for c in phrase.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            _ => {}
        }
    }
    !quoted
}
