//! ImageStreamTag 名の解析
//!
//! 設定の `image_tag`（例: `vddk:latest`）を ImageStreamTag の
//! `<stream>:<tag>` 形式に正規化する。

use crate::error::{BuildError, BuildResult};

/// ImageStreamTag 名をストリーム名とタグに分離
///
/// ImageStream はネームスペース内のリソースなので、レジストリやポートは
/// 含まれない。`:` はちょうど一つまで、`/` は不可。
///
/// # Examples
/// - `vddk:latest` -> `("vddk", "latest")`
/// - `vddk` -> `("vddk", "latest")`
/// - `vddk:8` -> `("vddk", "8")`
pub fn split_stream_tag(name: &str) -> BuildResult<(String, String)> {
    if name.contains('/') {
        return Err(BuildError::InvalidTag {
            tag: format!("Image stream tag must not contain '/': {}", name),
        });
    }

    match name.split_once(':') {
        Some((_, tag)) if tag.contains(':') => Err(BuildError::InvalidTag {
            tag: format!("Too many ':' in image stream tag: {}", name),
        }),
        Some((stream, tag)) => Ok((stream.to_string(), tag.to_string())),
        None => Ok((name.to_string(), "latest".to_string())),
    }
}

/// タグのバリデーション
///
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    for c in tag.chars() {
        if !c.is_ascii_alphanumeric() && c != '.' && c != '-' && c != '_' {
            return Err(BuildError::InvalidTag {
                tag: format!("Invalid character '{}' in tag: {}", c, tag),
            });
        }
    }

    Ok(())
}

/// ImageStream 名のバリデーション（小文字英数字、'-'、'.'）
fn validate_stream(stream: &str) -> BuildResult<()> {
    let valid = !stream.is_empty()
        && stream.len() <= 253
        && stream
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && stream
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        && stream
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidTag {
            tag: format!("Invalid image stream name: {}", stream),
        })
    }
}

/// `image_tag` を ImageStreamTag のリソース名に変換
pub fn image_stream_tag_name(image: &str) -> BuildResult<String> {
    let (stream, tag) = split_stream_tag(image)?;
    validate_stream(&stream)?;
    validate_tag(&tag)?;
    Ok(format!("{}:{}", stream, tag))
}
