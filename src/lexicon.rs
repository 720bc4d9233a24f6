//! Keyword, phrase and emoji lists used by the signal extractor.
//!
//! All word lists are lower-case and matched as substrings of the lower-cased
//! comment. Emoji are matched against the raw comment. Everything here is
//! built once on first use and never mutated.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Positive words (Vietnamese + common English slang seen in comments)
pub static POSITIVE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "xinh", "đẹp", "cute", "dễ thương", "hay", "tốt", "tuyệt", "vui", "thích", "yêu",
        "love", "amazing", "great", "good", "nice", "beautiful", "wonderful", "awesome",
        "thú vị", "hài", "vui vẻ", "hạnh phúc", "tuyệt vời", "xuất sắc", "giỏi", "tài",
        "khen", "khen ngợi", "ủng hộ", "đồng ý", "đúng", "chính xác", "chuẩn", "ok", "okay",
        "không sao", "k sao", "ko sao", "ổn", "fine", "alright", "xinh quá", "đẹp quá",
        "ngon", "ngon lắm", "thích lắm",
    ]
    .into_iter()
    .collect()
});

pub static NEGATIVE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "xấu", "tệ", "dở", "tồi", "kém", "ghét", "chán", "buồn", "thất vọng", "tức",
        "bad", "terrible", "awful", "hate", "disgusting", "horrible", "worst", "stupid",
        "ngu", "dốt", "đần", "lười", "vô dụng", "phản đối", "sai", "không đúng",
        "chê", "phê phán", "chỉ trích", "tức giận", "bực", "khó chịu",
        // boycott / scandal vocabulary
        "chịu", "tẩy chay", "phốt", "drama", "scandal", "lỗi", "sai lầm", "vấn đề",
        "thất bại", "thua", "thua lỗ", "giảm", "giảm doanh thu", "tụt dốc",
        "đi vào lòng đất", "toàn đi vào lòng đất", "sập", "phá sản", "đóng cửa",
        "cứu trợ", "trích 1k", "trích tiền", "lừa đảo", "lừa dối", "gian dối",
        "chán ghét", "mệt mỏi", "bức xúc", "bực bội",
        "không tốt", "không hay", "không ổn", "không được", "dở tệ", "tệ hại",
        "phản cảm", "gây sốc", "sốc", "kinh khủng", "khủng khiếp", "tồi tệ",
        "tội nghiệp", "đáng thương", "bất ngờ tiêu cực",
    ]
    .into_iter()
    .collect()
});

/// Idiomatic negative phrases; weighted above single keywords.
pub static NEGATIVE_PHRASES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "chịu rồi", "chịu thôi", "chịu luôn", "chịu không nổi",
        "tẩy chay", "tẩy chay hết", "tẩy chay luôn",
        "đi vào lòng đất", "toàn đi vào lòng đất",
        "cứu trợ", "trích 1k", "trích tiền cứu trợ",
        "giảm doanh thu", "giảm an tây",
        "hết vụ", "hết chiến dịch", "hết đợt",
        "từ lúc vụ", "từ vụ",
        "chưa chừa", "chưa bỏ",
        "tiêu chuẩn kép", "chuẩn kép",
        "bú fame", "làm content",
        "tối ngủ có ngon không", "ngủ có ngon không",
    ]
    .into_iter()
    .collect()
});

/// Explanatory / informational phrasing that pulls a comment toward neutral.
pub static NEUTRAL_PHRASES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "là do", "là vì", "chắc là", "có thể là", "có lẽ là",
        "nhân viên", "nv", "nhân viên bấm", "nv bấm", "nhân viên order",
        "đặt qua app", "order qua app", "qua app", "đặt app",
        "note như vậy", "ghi chú", "note lại", "ghi note",
        "thường là", "thông thường", "bình thường", "bthg",
        "không phải", "không phải do", "không phải là",
        "mình từng", "từng làm", "từng thấy",
        "đó là", "đây là", "cái này là", "cái đó là",
    ]
    .into_iter()
    .collect()
});

/// "It's fine / no worries" phrasing; boosts the positive score once.
pub static REASSURANCE_PHRASES: &[&str] = &["không sao", "k sao", "ko sao", "khong sao"];

pub static POSITIVE_EMOJIS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "😊", "😍", "🥰", "😘", "😁", "😂", "🤗", "😄", "😃", "😆", "😉",
        "💕", "💖", "💗", "💓", "💞", "❤️", "🧡", "💛", "💚", "💙",
        "💜", "🤍", "🖤", "🤎", "💯", "👍", "👏", "🎉", "🎊", "✨", "🌟",
    ]
    .into_iter()
    .collect()
});

pub static NEGATIVE_EMOJIS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "😢", "😭", "😤", "😠", "😡", "🤬", "😞", "😔", "😟", "😕",
        "🙁", "☹️", "😣", "😖", "😫", "😩", "💔", "👎", "❌", "🚫",
    ]
    .into_iter()
    .collect()
});

/// Laughing emoticons (`:))`, `=)))`, ...) that read as sarcasm in this corpus.
pub static SARCASM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[:=]\){2,}").expect("sarcasm pattern is a valid literal"));
