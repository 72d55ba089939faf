use rand::Rng;

const ID_LENGTH: usize = 17;

// No lookalike characters (0/O, 1/l/I, ...)
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTWXYZabcdefghijkmnopqrstuvwxyz";

/// Random document id
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids = (0..1000).map(|_| generate_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1000);
    }
}
