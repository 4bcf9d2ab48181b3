use crate::clock::{Clock, SystemClock};
use crate::entropy::{EntropySource, OsEntropy};
use crate::error::{GeneratorError, Result};
use crate::CodeGenerator;
use referral_core::{ReferralCode, CODE_DELIMITER};
use typed_builder::TypedBuilder;

const DEFAULT_RANDOM_BYTES: usize = 8;
/// Smallest random segment a generator will use.
pub const MIN_RANDOM_BYTES: usize = 4;

/// Configures a [`CandidateGenerator`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct CandidateSettings {
    /// Number of random bytes per candidate. The code carries twice as many
    /// hex characters. Values below [`MIN_RANDOM_BYTES`] are raised to it.
    #[builder(default = DEFAULT_RANDOM_BYTES)]
    pub random_bytes: usize,
}

impl Default for CandidateSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Checks that a service id can serve as the prefix segment of a code.
///
/// The id must be non-blank and must not contain the code delimiter,
/// otherwise the prefix of a generated code would be ambiguous.
pub fn validate_service_id(service_id: &str) -> Result<()> {
    if service_id.trim().is_empty() {
        return Err(GeneratorError::InvalidServiceId(
            "service id cannot be empty".to_string(),
        ));
    }

    if service_id.contains(CODE_DELIMITER) {
        return Err(GeneratorError::InvalidServiceId(format!(
            "service id must not contain '{}': '{}'",
            CODE_DELIMITER, service_id
        )));
    }

    Ok(())
}

/// Builds candidates of the form `{service_id}-{hex(random)}-{unix_nanos}`.
///
/// The random segment alone carries `8 * random_bytes` bits of entropy; the
/// timestamp further separates candidates drawn at different instants.
pub struct CandidateGenerator<E = OsEntropy, C = SystemClock> {
    entropy: E,
    clock: C,
    random_bytes: usize,
}

impl CandidateGenerator<OsEntropy, SystemClock> {
    /// Creates a generator backed by the OS RNG and the system clock.
    pub fn new(settings: CandidateSettings) -> Self {
        Self::with_sources(settings, OsEntropy, SystemClock)
    }
}

impl Default for CandidateGenerator<OsEntropy, SystemClock> {
    fn default() -> Self {
        Self::new(CandidateSettings::default())
    }
}

impl<E: EntropySource, C: Clock> CandidateGenerator<E, C> {
    /// Creates a generator with explicit entropy and time sources.
    pub fn with_sources(settings: CandidateSettings, entropy: E, clock: C) -> Self {
        Self {
            entropy,
            clock,
            random_bytes: settings.random_bytes.max(MIN_RANDOM_BYTES),
        }
    }

    pub fn random_bytes(&self) -> usize {
        self.random_bytes
    }

    /// Builds one candidate for `service_id`.
    pub fn candidate(&self, service_id: &str) -> Result<ReferralCode> {
        validate_service_id(service_id)?;

        let mut random = vec![0u8; self.random_bytes];
        self.entropy.fill(&mut random)?;

        let nanos = self.clock.now().as_nanosecond();

        Ok(ReferralCode::new_unchecked(format!(
            "{service_id}{CODE_DELIMITER}{}{CODE_DELIMITER}{nanos}",
            hex::encode(random)
        )))
    }
}

impl<E, C> CodeGenerator for CandidateGenerator<E, C>
where
    E: EntropySource + 'static,
    C: Clock + 'static,
{
    fn generate(&self, service_id: &str) -> Result<ReferralCode> {
        self.candidate(service_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use jiff::{SignedDuration, Timestamp};
    use std::collections::HashSet;

    struct FixedEntropy(u8);

    impl EntropySource for FixedEntropy {
        fn fill(&self, buf: &mut [u8]) -> Result<()> {
            buf.fill(self.0);
            Ok(())
        }
    }

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn fill(&self, _buf: &mut [u8]) -> Result<()> {
            Err(GeneratorError::Entropy("device not ready".to_string()))
        }
    }

    fn fixed_generator(byte: u8) -> CandidateGenerator<FixedEntropy, TestClock> {
        let clock = TestClock::new(
            Timestamp::from_second(1_700_000_000).unwrap(),
            SignedDuration::from_nanos(1),
        );
        CandidateGenerator::with_sources(CandidateSettings::default(), FixedEntropy(byte), clock)
    }

    fn split(code: &ReferralCode) -> (String, String, String) {
        let parts: Vec<&str> = code.as_str().split(CODE_DELIMITER).collect();
        assert_eq!(parts.len(), 3, "unexpected code shape: {code}");
        (
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        )
    }

    #[test]
    fn candidate_has_expected_format() {
        let generator = fixed_generator(0xab);

        let code = generator.candidate("svc1").unwrap();

        assert_eq!(
            code.as_str(),
            "svc1-abababababababab-1700000000000000000"
        );
    }

    #[test]
    fn os_backed_candidate_format() {
        let generator = CandidateGenerator::new(CandidateSettings::default());

        let code = generator.generate("svc1").unwrap();
        let (service, random, nanos) = split(&code);

        assert_eq!(service, "svc1");
        assert_eq!(random.len(), 16);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!nanos.is_empty());
        assert!(nanos.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn random_segment_follows_configured_length() {
        let settings = CandidateSettings::builder().random_bytes(4).build();
        let generator = CandidateGenerator::new(settings);

        let code = generator.generate("shop").unwrap();
        let (_, random, _) = split(&code);

        assert_eq!(random.len(), 8);
        assert_eq!(generator.random_bytes(), 4);
    }

    #[test]
    fn random_segment_never_shrinks_below_minimum() {
        for requested in [0, 1, MIN_RANDOM_BYTES - 1] {
            let settings = CandidateSettings::builder().random_bytes(requested).build();
            let generator = CandidateGenerator::new(settings);

            let code = generator.generate("svc1").unwrap();
            let (_, random, _) = split(&code);

            assert_eq!(generator.random_bytes(), MIN_RANDOM_BYTES);
            assert_eq!(random.len(), 2 * MIN_RANDOM_BYTES);
        }
    }

    #[test]
    fn timestamp_separates_equal_random_parts() {
        let generator = fixed_generator(0x00);

        let first = generator.candidate("svc").unwrap();
        let second = generator.candidate("svc").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn os_backed_candidates_are_distinct() {
        let generator = CandidateGenerator::new(CandidateSettings::default());
        let codes: HashSet<_> = (0..1_000)
            .map(|_| generator.generate("svc").unwrap())
            .collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn entropy_failure_aborts() {
        let generator = CandidateGenerator::with_sources(
            CandidateSettings::default(),
            BrokenEntropy,
            crate::clock::SystemClock,
        );

        let err = generator.candidate("svc").unwrap_err();
        assert!(matches!(err, GeneratorError::Entropy(_)));
    }

    #[test]
    fn rejects_blank_service_id() {
        let generator = fixed_generator(0x01);
        assert!(matches!(
            generator.candidate(""),
            Err(GeneratorError::InvalidServiceId(_))
        ));
        assert!(matches!(
            generator.candidate("   "),
            Err(GeneratorError::InvalidServiceId(_))
        ));
    }

    #[test]
    fn rejects_service_id_with_delimiter() {
        assert!(validate_service_id("svc-1").is_err());
        assert!(validate_service_id("svc_1").is_ok());
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CandidateGenerator>();
    }
}
