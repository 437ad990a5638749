use unicode_normalization::UnicodeNormalization;

/// 无标题时使用的默认文件名
pub const DEFAULT_FILENAME: &str = "video";

/// 产物文件扩展名
pub const ARTIFACT_EXTENSION: &str = "mp4";

/// 由任务标题生成附件文件名（不含扩展名）
///
/// 先做NFD分解并去掉组合附加符号，再只保留ASCII字母、数字、空白和`-`，
/// 最后把连续空白折叠成单个`-`。结果为空时回退为 [`DEFAULT_FILENAME`]。
pub fn derive_filename(title: Option<&str>) -> String {
    let Some(title) = title else {
        return DEFAULT_FILENAME.to_string();
    };

    let stripped: String = title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let slug = stripped.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        slug
    }
}

/// 带扩展名的附件文件名
pub fn attachment_filename(title: Option<&str>) -> String {
    format!("{}.{}", derive_filename(title), ARTIFACT_EXTENSION)
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
