//! Reserved vocabulary and name validation.
//!
//! DPCL programs draw entity names from a lowercase alphanumeric
//! vocabulary. A handful of names are reserved: they are bound by the
//! interpreter, never assignable by a program.
//!
//! | Name | Bound where | Resolves to |
//! |------|-------------|-------------|
//! | `self` | compound-frame content | the enclosing instance |
//! | `super` | compound-frame content | the enclosing instance's owner |
//! | `holder` | inside a frame | the frame's holder |
//! | `*` | match positions | any object |
//! | `#*` | power-frame actions | any event |
//!
//! Using a reserved name as an assignable name (an atomic, an alias,
//! a template name or parameter) is a name error at load time.

/// The enclosing compound instance.
pub const SELF: &str = "self";

/// The owner of the enclosing compound instance.
pub const SUPER: &str = "super";

/// The holder of the enclosing frame.
pub const HOLDER: &str = "holder";

/// The object wildcard, matching any object in a match position.
pub const WILDCARD: &str = "*";

/// The event wildcard, matching any event in a power action.
pub const WILDCARD_EVENT: &str = "#*";

/// Returns `true` if `name` is reserved and therefore not assignable.
///
/// # Example
///
/// ```
/// use dpcl_types::name;
///
/// assert!(name::is_reserved("self"));
/// assert!(name::is_reserved("*"));
/// assert!(!name::is_reserved("alice"));
/// ```
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    matches!(name, SELF | SUPER | HOLDER | WILDCARD | WILDCARD_EVENT)
}

/// Returns `true` if `name` is syntactically well formed: a lowercase
/// letter followed by lowercase letters, digits or underscores.
///
/// Reserved names pass this check; whether a well-formed name may be
/// *assigned* is a separate question ([`is_valid`]), so that the
/// loader can report reserved-name misuse as a name error rather
/// than a shape error.
///
/// # Example
///
/// ```
/// use dpcl_types::name;
///
/// assert!(name::is_well_formed("alice"));
/// assert!(name::is_well_formed("self"));
/// assert!(!name::is_well_formed("Alice"));
/// ```
#[must_use]
pub fn is_well_formed(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Returns `true` if `name` is a well-formed assignable name: a
/// lowercase letter followed by lowercase letters, digits or
/// underscores, and not reserved.
///
/// # Example
///
/// ```
/// use dpcl_types::name;
///
/// assert!(name::is_valid("alice"));
/// assert!(name::is_valid("request_return"));
/// assert!(!name::is_valid("Alice"));
/// assert!(!name::is_valid("self"));
/// assert!(!name::is_valid(""));
/// ```
#[must_use]
pub fn is_valid(name: &str) -> bool {
    is_well_formed(name) && !is_reserved(name)
}

/// Returns `true` if `tag` is a well-formed event tag: `#` followed
/// by a valid name, or the event wildcard `#*`.
///
/// # Example
///
/// ```
/// use dpcl_types::name;
///
/// assert!(name::is_valid_event_tag("#borrow"));
/// assert!(name::is_valid_event_tag("#*"));
/// assert!(!name::is_valid_event_tag("borrow"));
/// assert!(!name::is_valid_event_tag("#"));
/// ```
#[must_use]
pub fn is_valid_event_tag(tag: &str) -> bool {
    if tag == WILDCARD_EVENT {
        return true;
    }

    match tag.strip_prefix('#') {
        Some(rest) => is_valid(rest),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        for name in [SELF, SUPER, HOLDER, WILDCARD, WILDCARD_EVENT] {
            assert!(is_reserved(name), "{name} should be reserved");
        }
        assert!(!is_reserved("holder_of"));
        assert!(!is_reserved("selfie"));
    }

    #[test]
    fn valid_names() {
        assert!(is_valid("a"));
        assert!(is_valid("dracula"));
        assert!(is_valid("d1"));
        assert!(is_valid("early_timeout"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid(""));
        assert!(!is_valid("1abc"));
        assert!(!is_valid("_abc"));
        assert!(!is_valid("Alice"));
        assert!(!is_valid("a-b"));
        assert!(!is_valid("#borrow"));
        assert!(!is_valid("self"));
    }

    #[test]
    fn well_formed_includes_reserved_words() {
        assert!(is_well_formed("self"));
        assert!(is_well_formed("holder"));
        assert!(!is_well_formed("*"));
        assert!(!is_valid("self"));
    }

    #[test]
    fn event_tags() {
        assert!(is_valid_event_tag("#timeout"));
        assert!(is_valid_event_tag("#*"));
        assert!(!is_valid_event_tag("#Timeout"));
        assert!(!is_valid_event_tag("timeout"));
        assert!(!is_valid_event_tag("##x"));
    }
}
