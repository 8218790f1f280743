/// Characters a short code is drawn from.
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Produces candidate short codes.
///
/// Generators don't touch storage; the caller is responsible for
/// rejecting candidates that are already taken.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws each character uniformly from [`ALPHABET`].
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(self.length)
            .collect()
    }
}

pub fn is_valid_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_code_shape() {
        for length in [1, 6, 12] {
            let generator = RandomCodeGenerator::new(length);
            for _ in 0..200 {
                let code = generator.generate();
                assert!(is_valid_code(&code, length), "bad code {code:?}");
            }
        }
    }

    #[test]
    fn test_generated_codes_vary() {
        let generator = RandomCodeGenerator::new(6);
        let codes: HashSet<String> = (0..100).map(|_| generator.generate()).collect();
        // 100 draws from 62^6 codes; anything close to all-equal means the rng is broken
        assert!(codes.len() > 90);
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("3d0Xa9", 6));
        assert!(!is_valid_code("3d0Xa", 6));
        assert!(!is_valid_code("3d0X-9", 6));
        assert!(!is_valid_code("3d0Xaé", 6));
    }
}
