//! Short labels for the provider's category paths, e.g. `음식점 > 한식 > 국수`.

const ROOT_CATEGORY: &str = "음식점";
const SEPARATOR: &str = " > ";

pub const DEFAULT_EMOJI: &str = "🍽️";

// First match wins, so a few later rows are shadowed by earlier ones (피자 lands on 양식).
const EMOJI_TABLE: &[(&[&str], &str)] = &[
    (
        &["한식", "한정식", "백반", "국수", "냉면", "갈비", "삼겹살", "불고기", "비빔밥"],
        "🇰🇷",
    ),
    (&["중식", "중국", "짜장", "짬뽕", "탕수육", "마라", "딤섬"], "🇨🇳"),
    (
        &["일식", "일본", "초밥", "라멘", "우동", "돈까스", "회", "사시미", "스시"],
        "🇯🇵",
    ),
    (
        &["양식", "이탈리안", "파스타", "피자", "스테이크", "햄버거", "브런치", "샐러드"],
        "🇮🇹",
    ),
    (&["치킨", "닭", "통닭"], "🍗"),
    (&["피자"], "🍕"),
    (
        &["카페", "커피", "디저트", "베이커리", "빵", "케이크", "아이스크림", "도넛"],
        "☕",
    ),
    (&["술집", "호프", "맥주", "펜션", "이자카야"], "🍺"),
    (&["분식", "떡볶이", "김밥", "순대", "튀김"], "🍢"),
    (&["고기", "구이", "바베큐", "bbq", "소고기", "돼지고기"], "🥩"),
    (
        &["해산물", "생선", "조개", "회", "낙지", "문어", "새우", "게"],
        "🦐",
    ),
    (&["면", "국수", "라면", "우동", "파스타", "쌀국수"], "🍜"),
    (
        &["패스트푸드", "햄버거", "맥도날드", "버거킹", "kfc", "롯데리아"],
        "🍔",
    ),
];

pub fn emoji(category_path: &str) -> &'static str {
    let category = category_path.to_lowercase();

    EMOJI_TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| category.contains(k)))
        .map(|(_, emoji)| *emoji)
        .unwrap_or(DEFAULT_EMOJI)
}

/// The second segment under the generic restaurant root, otherwise the most specific segment.
pub fn simplify(category_path: &str) -> &str {
    let parts: Vec<&str> = category_path.split(SEPARATOR).collect();

    if parts.len() >= 2 && parts[0] == ROOT_CATEGORY {
        return parts[1];
    }

    parts
        .last()
        .filter(|last| !last.is_empty())
        .copied()
        .unwrap_or(category_path)
}
