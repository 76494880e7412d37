use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// An opaque, unguessable reconnection credential (spec §4.6): 128 bits of
/// OS randomness, handed to the client once as `session_created.token` and
/// presented back verbatim on reconnect. Never logged, never echoed in any
/// broadcast payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token([u8; 16]);

impl Token {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn decode(s: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(s).ok()?;
        let bytes: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Token(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_its_own_encoding() {
        let token = Token::generate();
        let encoded = token.encode();
        let decoded = Token::decode(&encoded).unwrap();
        assert!(decoded == token);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Token::decode("not valid base64!!").is_none());
    }

    #[test]
    fn two_tokens_differ() {
        assert!(Token::generate() != Token::generate());
    }
}
