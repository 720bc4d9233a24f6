//! Prompt construction and answer parsing for the LLM backend.
//!
//! The model is asked to answer with bare numbers (`1`, `0`, `-1`). Anything
//! the parser cannot map to a label becomes an `InferenceError` and is left to
//! the caller's fallback.

use crate::error::InferenceError;
use crate::label::SentimentLabel;
use crate::model::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;

/// Most comments sent in one prompt.
pub const MAX_BATCH_ITEMS: usize = 20;
pub const SINGLE_OUTPUT_TOKENS: u32 = 5;
const TOKENS_PER_ITEM: u32 = 5;
const MAX_BATCH_OUTPUT_TOKENS: u32 = 100;
/// Per-item character cap inside a batch prompt.
pub const MAX_BATCH_ITEM_CHARS: usize = 500;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("integer pattern is a valid literal"));

pub fn batch_output_tokens(items: usize) -> u32 {
    let items = u32::try_from(items).unwrap_or(u32::MAX);
    items.saturating_mul(TOKENS_PER_ITEM).min(MAX_BATCH_OUTPUT_TOKENS)
}

pub fn single_prompt(comment: &str) -> String {
    format!(
        r#"Phân tích cảm xúc comment và trả về CHỈ MỘT SỐ: 1, 0, hoặc -1.

Comment: "{}"

QUY TẮC:
- 1 (tích cực): Khen, thích, yêu, ủng hộ, vui, hài lòng, tốt, đẹp, ngon, hay
- 0 (trung tính): CHỈ khi là câu hỏi thuần túy, giải thích kỹ thuật, thông tin khách quan KHÔNG có cảm xúc
- -1 (tiêu cực): Chê, ghét, tức, thất vọng, chán, phê phán, sarcasm tiêu cực (=)), :)) với context tiêu cực), từ khóa: chịu, tẩy chay, phốt, drama, cứu trợ, đi vào lòng đất

VÍ DỤ:
"ngon quá" → 1
"đẹp lắm" → 1
"tẩy chay katinat" → -1
"chịu rồi" → -1
"phốt vụ 1k" → -1
"chiến dịch đi vào lòng đất =))" → -1
"nhân viên bấm note" → 0 (giải thích kỹ thuật)
"đặt qua app như nào?" → 0 (câu hỏi)
"tui thấy hơi ấy :)" → -1 (có cảm xúc tiêu cực)

QUAN TRỌNG: Nếu có BẤT KỲ cảm xúc (dù nhẹ), đừng đánh 0. Chỉ đánh 0 khi thực sự là thông tin khách quan.

Trả về CHỈ số: 1, 0, hoặc -1"#,
        comment.trim()
    )
}

/// Numbered list prompt; one answer line expected per comment, in order.
pub fn batch_prompt(comments: &[&str]) -> String {
    let listing = comments
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let flat = c.trim().replace(|ch: char| ch == '\r' || ch == '\n', " ");
            format!("{}. \"{}\"", i + 1, truncate_chars(&flat, MAX_BATCH_ITEM_CHARS))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Phân tích cảm xúc các comments sau và trả về CHỈ CÁC SỐ, mỗi dòng 1 số (1, 0, hoặc -1) tương ứng với từng comment theo thứ tự.

Comments:
{}

QUY TẮC:
- 1: Khen, thích, yêu, ủng hộ, vui, hài lòng, tốt, đẹp, ngon
- 0: CHỈ khi là câu hỏi thuần túy hoặc giải thích kỹ thuật KHÔNG có cảm xúc
- -1: Chê, ghét, tức, thất vọng, chán, phê phán, sarcasm tiêu cực (=)), :)), từ: chịu, tẩy chay, phốt, drama, cứu trợ

QUAN TRỌNG: Nếu có BẤT KỲ cảm xúc (dù nhẹ), đừng đánh 0.

Trả về CHỈ CÁC SỐ, mỗi dòng 1 số, theo thứ tự:
1
0
-1
..."#,
        listing
    )
}

fn label_from_match(raw: &str) -> Result<SentimentLabel, InferenceError> {
    // Digit runs too long for i64 are out of range too.
    let value: i64 = raw.parse().map_err(|_| InferenceError::OutOfRange(i64::MAX))?;
    SentimentLabel::from_value(value).ok_or(InferenceError::OutOfRange(value))
}

/// First integer in the answer, if it is a valid label.
pub fn parse_single(response: &str) -> Result<SentimentLabel, InferenceError> {
    match INTEGER.find(response) {
        Some(m) => label_from_match(m.as_str()),
        None => Err(InferenceError::Unparsable(response.trim().to_string())),
    }
}

/// Integers assigned to items in order. An out-of-range value still uses up
/// its slot; items past the last integer are `MissingItem`.
pub fn parse_batch(response: &str, expected: usize) -> Vec<Result<SentimentLabel, InferenceError>> {
    let mut values = INTEGER.find_iter(response).map(|m| label_from_match(m.as_str()));
    (0..expected)
        .map(|i| values.next().unwrap_or(Err(InferenceError::MissingItem(i))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        assert_eq!(parse_single("1"), Ok(SentimentLabel::Positive));
        assert_eq!(parse_single(" -1\n"), Ok(SentimentLabel::Negative));
        assert_eq!(parse_single("Kết quả: 0"), Ok(SentimentLabel::Neutral));
        assert_eq!(parse_single("5"), Err(InferenceError::OutOfRange(5)));
        assert!(matches!(parse_single("tích cực"), Err(InferenceError::Unparsable(_))));
    }

    #[test]
    fn test_parse_batch_in_order() {
        let out = parse_batch("1\n0\n-1\n1", 4);
        assert_eq!(
            out,
            vec![
                Ok(SentimentLabel::Positive),
                Ok(SentimentLabel::Neutral),
                Ok(SentimentLabel::Negative),
                Ok(SentimentLabel::Positive),
            ]
        );
    }

    #[test]
    fn test_parse_batch_out_of_range_consumes_slot() {
        let out = parse_batch("1\n7\n-1", 3);
        assert_eq!(out[0], Ok(SentimentLabel::Positive));
        assert_eq!(out[1], Err(InferenceError::OutOfRange(7)));
        assert_eq!(out[2], Ok(SentimentLabel::Negative));
    }

    #[test]
    fn test_parse_batch_short_answer() {
        let out = parse_batch("1", 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], Err(InferenceError::MissingItem(1)));
        assert_eq!(out[2], Err(InferenceError::MissingItem(2)));

        let garbage = parse_batch("xin lỗi, tôi không hiểu", 5);
        assert!(garbage.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_parse_batch_ignores_extra_numbers() {
        assert_eq!(parse_batch("0 1 1 1", 2).len(), 2);
    }

    #[test]
    fn test_huge_integer_is_out_of_range() {
        assert!(matches!(parse_single("99999999999999999999"), Err(InferenceError::OutOfRange(_))));
    }

    #[test]
    fn test_batch_output_tokens() {
        assert_eq!(batch_output_tokens(1), 5);
        assert_eq!(batch_output_tokens(20), 100);
        assert_eq!(batch_output_tokens(64), 100);
    }

    #[test]
    fn test_batch_prompt_numbers_and_flattens() {
        let prompt = batch_prompt(&["ngon quá", "dòng 1\ndòng 2"]);
        assert!(prompt.contains("1. \"ngon quá\""));
        assert!(prompt.contains("2. \"dòng 1 dòng 2\""));
    }

    #[test]
    fn test_batch_prompt_truncates_long_items() {
        let long = "a".repeat(800);
        let prompt = batch_prompt(&[long.as_str()]);
        assert!(prompt.contains(&format!("1. \"{}\"", "a".repeat(MAX_BATCH_ITEM_CHARS))));
        assert!(!prompt.contains(&"a".repeat(MAX_BATCH_ITEM_CHARS + 1)));
    }

    #[test]
    fn test_single_prompt_embeds_comment() {
        assert!(single_prompt("  tẩy chay  ").contains("Comment: \"tẩy chay\""));
    }
}
