use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Highest number in the pool (numbers run 1..=49).
pub const MAX_NUMBER: u8 = 49;
pub const POOL_SIZE: usize = MAX_NUMBER as usize;
/// Winning numbers per draw, special number excluded.
pub const WINNING_COUNT: usize = 6;
pub const SINGLE_SIZE: usize = 6;
pub const DOUBLE_SIZE: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub draw_id: String,
    pub date: NaiveDate,
    pub numbers: [u8; WINNING_COUNT],
    pub special: u8,
}

impl Draw {
    /// Winning numbers followed by the special number.
    pub fn combined(&self) -> [u8; WINNING_COUNT + 1] {
        let mut out = [0u8; WINNING_COUNT + 1];
        out[..WINNING_COUNT].copy_from_slice(&self.numbers);
        out[WINNING_COUNT] = self.special;
        out
    }

    pub fn contains(&self, number: u8) -> bool {
        self.special == number || self.numbers.contains(&number)
    }
}

pub fn is_valid_number(n: u8) -> bool {
    (1..=MAX_NUMBER).contains(&n)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    pub sequence_number: u32,
    pub numbers: Vec<u8>,
}

impl Combination {
    pub fn contains_all(&self, required: &[u8]) -> bool {
        required.iter().all(|n| self.numbers.contains(n))
    }
}

pub fn validate_draw(numbers: &[u8; WINNING_COUNT], special: u8) -> Result<()> {
    for &n in numbers {
        if !is_valid_number(n) {
            bail!("Number {} out of range (1-{})", n, MAX_NUMBER);
        }
    }
    if !is_valid_number(special) {
        bail!("Special number {} out of range (1-{})", special, MAX_NUMBER);
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Duplicate number: {}", numbers[i]);
            }
        }
    }
    if numbers.contains(&special) {
        bail!("Special number {} already among the winning numbers", special);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(numbers: [u8; 6], special: u8) -> Draw {
        Draw {
            draw_id: "24/001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            numbers,
            special,
        }
    }

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 7).is_ok());
        assert!(validate_draw(&[49, 48, 47, 46, 45, 44], 1).is_ok());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        assert!(validate_draw(&[0, 2, 3, 4, 5, 6], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 50], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 50).is_err());
    }

    #[test]
    fn test_validate_draw_duplicates() {
        assert!(validate_draw(&[1, 1, 3, 4, 5, 6], 7).is_err());
    }

    #[test]
    fn test_validate_draw_special_among_numbers() {
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 6).is_err());
    }

    #[test]
    fn test_combined_appends_special() {
        let d = draw([3, 9, 14, 22, 31, 40], 17);
        assert_eq!(d.combined(), [3, 9, 14, 22, 31, 40, 17]);
        assert!(d.contains(17));
        assert!(d.contains(40));
        assert!(!d.contains(1));
    }

    #[test]
    fn test_combination_contains_all() {
        let c = Combination { sequence_number: 1, numbers: vec![2, 7, 19, 33, 42, 48] };
        assert!(c.contains_all(&[7, 42]));
        assert!(!c.contains_all(&[7, 43]));
        assert!(c.contains_all(&[]));
    }
}
