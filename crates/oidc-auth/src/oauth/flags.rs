//! Space-separated parameter sets (`scope`, `prompt`, `response_type`).
//!
//! Each parameter is parsed into a [`FlagSet`] tagged with its vocabulary, so
//! a scope set can never be compared against a prompt set. Input that contains
//! no recognized token parses to the [`FlagSet::UNRECOGNIZED`] sentinel, which
//! is distinct from every real flag (including `prompt=none`).
//!
//! Two predicates are provided and they are not interchangeable:
//!
//! - [`FlagSet::has`]: any overlap. `code` has `code|token`.
//! - [`FlagSet::is`]: exact equality. `code` is not `code|token`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{BitOr, BitOrAssign};

/// Token vocabulary of one parameter kind.
pub trait Vocabulary {
    /// Parameter name, used in debug output.
    const NAME: &'static str;

    /// Recognized tokens and their bits, in display order.
    const TOKENS: &'static [(&'static str, u8)];
}

/// A set of flags parsed from a space-separated parameter.
pub struct FlagSet<V> {
    bits: u8,
    _kind: PhantomData<fn() -> V>,
}

const UNRECOGNIZED_BIT: u8 = 0x80;

impl<V: Vocabulary> FlagSet<V> {
    /// Sentinel for empty input or input with no recognized token.
    pub const UNRECOGNIZED: Self = Self::from_bits(UNRECOGNIZED_BIT);

    const fn from_bits(bits: u8) -> Self {
        Self {
            bits,
            _kind: PhantomData,
        }
    }

    /// Parses a space-separated list of tokens.
    ///
    /// Unknown tokens are ignored; duplicates are idempotent.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let bits = raw
            .split(' ')
            .filter_map(|token| {
                V::TOKENS
                    .iter()
                    .find(|(name, _)| *name == token)
                    .map(|(_, bit)| *bit)
            })
            .fold(0u8, |acc, bit| acc | bit);

        if bits == 0 {
            Self::UNRECOGNIZED
        } else {
            Self::from_bits(bits)
        }
    }

    /// Returns `true` if the two sets share at least one flag.
    #[must_use]
    pub fn has(self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    /// Returns `true` if the two sets contain exactly the same flags.
    #[must_use]
    pub fn is(self, other: Self) -> bool {
        self.bits == other.bits
    }

    /// Returns `true` if nothing recognizable was parsed.
    #[must_use]
    pub fn is_unrecognized(self) -> bool {
        self.bits == UNRECOGNIZED_BIT
    }

    /// Raw bit value.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.bits
    }

    /// Recognized tokens present in the set, in vocabulary order.
    pub fn tokens(self) -> impl Iterator<Item = &'static str> {
        V::TOKENS
            .iter()
            .filter(move |(_, bit)| self.bits & bit != 0)
            .map(|(name, _)| *name)
    }
}

impl<V> Clone for FlagSet<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for FlagSet<V> {}

impl<V> PartialEq for FlagSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<V> Eq for FlagSet<V> {}

impl<V> Hash for FlagSet<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<V: Vocabulary> Default for FlagSet<V> {
    fn default() -> Self {
        Self::UNRECOGNIZED
    }
}

impl<V: Vocabulary> BitOr for FlagSet<V> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        // the sentinel is absorbed once a real flag is present
        let bits = (self.bits | rhs.bits) & !UNRECOGNIZED_BIT;
        if bits == 0 {
            Self::UNRECOGNIZED
        } else {
            Self::from_bits(bits)
        }
    }
}

impl<V: Vocabulary> BitOrAssign for FlagSet<V> {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl<V: Vocabulary> fmt::Display for FlagSet<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl<V: Vocabulary> fmt::Debug for FlagSet<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unrecognized() {
            write!(f, "{}(<unrecognized>)", V::NAME)
        } else {
            write!(f, "{}({})", V::NAME, self)
        }
    }
}

// =============================================================================
// Vocabularies
// =============================================================================

/// `scope` vocabulary.
pub enum ScopeKind {}

impl Vocabulary for ScopeKind {
    const NAME: &'static str = "Scope";
    const TOKENS: &'static [(&'static str, u8)] = &[
        ("openid", 4),
        ("profile", 16),
        ("email", 2),
        ("address", 1),
        ("phone", 8),
    ];
}

/// `prompt` vocabulary.
pub enum PromptKind {}

impl Vocabulary for PromptKind {
    const NAME: &'static str = "Prompt";
    const TOKENS: &'static [(&'static str, u8)] = &[
        ("none", 1),
        ("login", 2),
        ("consent", 4),
        ("select_account", 8),
    ];
}

/// `response_type` vocabulary.
pub enum ResponseTypeKind {}

impl Vocabulary for ResponseTypeKind {
    const NAME: &'static str = "ResponseType";
    const TOKENS: &'static [(&'static str, u8)] = &[("code", 1), ("id_token", 2), ("token", 4)];
}

pub type ScopeSet = FlagSet<ScopeKind>;
pub type PromptSet = FlagSet<PromptKind>;
pub type ResponseTypeSet = FlagSet<ResponseTypeKind>;

impl FlagSet<ScopeKind> {
    pub const ADDRESS: Self = Self::from_bits(1);
    pub const EMAIL: Self = Self::from_bits(2);
    pub const OPENID: Self = Self::from_bits(4);
    pub const PHONE: Self = Self::from_bits(8);
    pub const PROFILE: Self = Self::from_bits(16);
}

impl FlagSet<PromptKind> {
    pub const NONE: Self = Self::from_bits(1);
    pub const LOGIN: Self = Self::from_bits(2);
    pub const CONSENT: Self = Self::from_bits(4);
    pub const SELECT_ACCOUNT: Self = Self::from_bits(8);
}

impl FlagSet<ResponseTypeKind> {
    pub const CODE: Self = Self::from_bits(1);
    pub const ID_TOKEN: Self = Self::from_bits(2);
    pub const TOKEN: Self = Self::from_bits(4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        let scope = ScopeSet::parse("openid profile email");
        assert!(scope.has(ScopeSet::OPENID));
        assert!(scope.has(ScopeSet::PROFILE));
        assert!(scope.has(ScopeSet::EMAIL));
        assert!(!scope.has(ScopeSet::PHONE));
        assert!(!scope.has(ScopeSet::ADDRESS));
        assert!(scope.is(ScopeSet::OPENID | ScopeSet::PROFILE | ScopeSet::EMAIL));
    }

    #[test]
    fn test_parse_all_vocabularies() {
        assert!(
            PromptSet::parse("none login consent select_account").is(PromptSet::NONE
                | PromptSet::LOGIN
                | PromptSet::CONSENT
                | PromptSet::SELECT_ACCOUNT)
        );
        assert!(
            ResponseTypeSet::parse("code id_token token").is(ResponseTypeSet::CODE
                | ResponseTypeSet::ID_TOKEN
                | ResponseTypeSet::TOKEN)
        );
        assert!(
            ScopeSet::parse("address email openid phone profile").is(ScopeSet::ADDRESS
                | ScopeSet::EMAIL
                | ScopeSet::OPENID
                | ScopeSet::PHONE
                | ScopeSet::PROFILE)
        );
    }

    #[test]
    fn test_empty_and_unknown_are_unrecognized() {
        assert!(ScopeSet::parse("").is_unrecognized());
        assert!(ScopeSet::parse("bogus").is_unrecognized());
        assert!(ScopeSet::parse(" ").is_unrecognized());
        assert!(ResponseTypeSet::parse("Code").is_unrecognized());
    }

    #[test]
    fn test_empty_prompt_is_not_none() {
        let prompt = PromptSet::parse("");
        assert!(!prompt.is(PromptSet::NONE));
        assert!(!prompt.has(PromptSet::NONE));
        assert!(PromptSet::parse("none").is(PromptSet::NONE));
    }

    #[test]
    fn test_unknown_tokens_ignored_when_mixed() {
        let scope = ScopeSet::parse("openid offline_access");
        assert!(scope.is(ScopeSet::OPENID));
        assert!(!scope.is_unrecognized());
    }

    #[test]
    fn test_duplicates_idempotent() {
        for s in ["openid", "openid email", "", "junk", "phone address phone"] {
            let once = ScopeSet::parse(s);
            let twice = ScopeSet::parse(&format!("{} {}", s, s));
            assert_eq!(once, twice, "input {:?}", s);
        }
        for s in ["code", "code token", "none", ""] {
            assert_eq!(
                ResponseTypeSet::parse(s),
                ResponseTypeSet::parse(&format!("{} {}", s, s))
            );
            assert_eq!(PromptSet::parse(s), PromptSet::parse(&format!("{} {}", s, s)));
        }
    }

    #[test]
    fn test_has_versus_is() {
        let code = ResponseTypeSet::parse("code");
        let code_or_token = ResponseTypeSet::CODE | ResponseTypeSet::TOKEN;

        assert!(code.has(code_or_token));
        assert!(!code.is(code_or_token));
        assert!(code.is(ResponseTypeSet::CODE));
        assert!(!code.has(ResponseTypeSet::ID_TOKEN));
    }

    #[test]
    fn test_unrecognized_has_no_real_flag() {
        let junk = ScopeSet::parse("junk");
        for flag in [
            ScopeSet::ADDRESS,
            ScopeSet::EMAIL,
            ScopeSet::OPENID,
            ScopeSet::PHONE,
            ScopeSet::PROFILE,
        ] {
            assert!(!junk.has(flag));
        }
        assert!(junk.is(ScopeSet::UNRECOGNIZED));
    }

    #[test]
    fn test_bitor_absorbs_sentinel() {
        let merged = ScopeSet::UNRECOGNIZED | ScopeSet::OPENID;
        assert!(merged.is(ScopeSet::OPENID));
        assert!((ScopeSet::UNRECOGNIZED | ScopeSet::UNRECOGNIZED).is_unrecognized());

        let mut set = ScopeSet::OPENID;
        set |= ScopeSet::EMAIL;
        assert!(set.is(ScopeSet::OPENID | ScopeSet::EMAIL));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ScopeSet::parse("email openid profile").to_string(),
            "openid profile email"
        );
        assert_eq!(ScopeSet::parse("").to_string(), "");
        assert_eq!(format!("{:?}", PromptSet::LOGIN), "Prompt(login)");
        assert_eq!(
            format!("{:?}", PromptSet::UNRECOGNIZED),
            "Prompt(<unrecognized>)"
        );
    }

    #[test]
    fn test_display_round_trips_recognized_tokens() {
        let scope = ScopeSet::parse("phone openid junk");
        assert_eq!(ScopeSet::parse(&scope.to_string()), scope);
    }
}
