use loto49_db::models::is_valid_number;

use crate::error::ConstraintViolation;
use crate::request::GenerationRequest;

/// Structural checks on a request, in a fixed order; the first failure wins.
pub fn validate(request: &GenerationRequest) -> Result<(), ConstraintViolation> {
    if request.combination_count < 1 {
        return Err(ConstraintViolation::CombinationCount);
    }
    if !is_valid_number(request.lucky_number) {
        return Err(ConstraintViolation::LuckyOutOfRange(request.lucky_number));
    }

    let mut seen = [false; 256];
    for &n in &request.selected_numbers {
        if !is_valid_number(n) {
            return Err(ConstraintViolation::SelectedOutOfRange(n));
        }
        if seen[n as usize] {
            return Err(ConstraintViolation::DuplicateSelected(n));
        }
        seen[n as usize] = true;
    }
    if seen[request.lucky_number as usize] {
        return Err(ConstraintViolation::LuckyAmongSelected(request.lucky_number));
    }

    let mandatory = request.selected_numbers.len() + 1;
    let required = request.required_size();
    if mandatory > required {
        return Err(ConstraintViolation::Overflow { mandatory, required });
    }
    Ok(())
}
