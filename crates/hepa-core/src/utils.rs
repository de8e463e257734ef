//! 通用工具函数

use uuid::Uuid;

/// 生成分析ID（每个请求独立的产物目录名）
pub fn generate_analysis_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 校验分析ID格式：32位小写十六进制
pub fn is_valid_analysis_id(id: &str) -> bool {
    id.len() == 32 && id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// 宽松数值解析，无法解析或非有限值时返回 None
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 肝酶读数解析：仅保留数字和小数点后再解析，例如 "45 IU/L" → 45.0
pub fn parse_enzyme_reading(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    parse_number(&cleaned)
}

/// 取上传文件名的最后一段路径，剔除目录穿越和控制字符
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let last = filename.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
