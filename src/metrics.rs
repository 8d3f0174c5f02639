use std::collections::HashSet;

use crate::substrate::Substrate;

/// High-order entropy (HOE) of a byte slice: brotli-compressed size (quality
/// 2) over raw size.
///
/// Near 1.0 for random tapes; drops well below 1.0 once replicators have
/// copied the same pattern across many programs. Values slightly above 1.0
/// are possible due to compression overhead.
pub fn high_order_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut compressed = Vec::new();
    let params = brotli::enc::BrotliEncoderParams {
        quality: 2,
        ..Default::default()
    };
    brotli::BrotliCompress(&mut &data[..], &mut compressed, &params)
        .expect("brotli compression into a Vec should not fail");

    compressed.len() as f64 / data.len() as f64
}

/// Number of distinct tapes in a flat population buffer.
pub fn unique_program_count(population: &[u8], tape_length: usize) -> usize {
    if tape_length == 0 {
        return 0;
    }
    population
        .chunks_exact(tape_length)
        .collect::<HashSet<&[u8]>>()
        .len()
}

pub fn zero_byte_count(population: &[u8]) -> usize {
    population.iter().filter(|&&b| b == 0).count()
}

/// Histogram of cell values, one count per byte value.
pub fn byte_frequency_histogram(population: &[u8]) -> [usize; 256] {
    let mut hist = [0usize; 256];
    for &b in population {
        hist[b as usize] += 1;
    }
    hist
}

/// Fraction of cells holding a recognized instruction of `S`.
pub fn instruction_density<S: Substrate>(population: &[u8]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let count = population.iter().filter(|&&b| S::is_instruction(b)).count();
    count as f64 / population.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bff::Bff;

    #[test]
    fn test_hoe_random_data_near_one() {
        use rand::Rng;
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(12345);
        let data: Vec<u8> = (0..8192).map(|_| rng.r#gen()).collect();
        let hoe = high_order_entropy(&data);
        assert!(hoe > 0.9, "HOE of random data should be near 1.0, got {hoe}");
    }

    #[test]
    fn test_hoe_repeated_tapes_low() {
        let data: Vec<u8> = b"[[{.>]-]".iter().copied().cycle().take(8192).collect();
        let hoe = high_order_entropy(&data);
        assert!(hoe < 0.1, "HOE of a replicated tape should be low, got {hoe}");
    }

    #[test]
    fn test_hoe_empty() {
        assert_eq!(high_order_entropy(&[]), 0.0);
    }

    #[test]
    fn test_unique_program_count() {
        let population = [1u8, 2, 1, 2, 3, 4, 1, 2];
        assert_eq!(unique_program_count(&population, 2), 2);
        assert_eq!(unique_program_count(&population, 4), 2);
        assert_eq!(unique_program_count(&[], 4), 0);
        assert_eq!(unique_program_count(&population, 0), 0);
    }

    #[test]
    fn test_zero_byte_count() {
        assert_eq!(zero_byte_count(&[0, 1, 0, 2, 0, 0, 0, 3]), 5);
        assert_eq!(zero_byte_count(&[1, 2, 3]), 0);
    }

    #[test]
    fn test_byte_frequency_histogram() {
        let hist = byte_frequency_histogram(&[0, 0, 1, 255, 0, 1, 1, 2]);
        assert_eq!(hist[0], 3);
        assert_eq!(hist[1], 3);
        assert_eq!(hist[2], 1);
        assert_eq!(hist[255], 1);
        assert_eq!(hist.iter().sum::<usize>(), 8);
    }

    #[test]
    fn test_instruction_density() {
        assert_eq!(instruction_density::<Bff>(b"[+]x"), 0.75);
        assert_eq!(instruction_density::<Bff>(&[]), 0.0);
    }
}
