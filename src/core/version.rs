// バージョンラベルの比較
//
// 台帳に保存されたバージョンと宣言バージョンをセマンティックバージョンとして
// 比較します。先頭の "v" と欠けた要素（"1.2" など）は補って解釈します。

use crate::core::error::DeclarationError;
use semver::Version;
use std::cmp::Ordering;

/// バージョンラベルを解析
pub fn parse_version(label: &str) -> Result<Version, DeclarationError> {
    let trimmed = label.trim();
    let body = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if body.is_empty() {
        return Err(DeclarationError::InvalidVersion {
            label: label.to_string(),
            reason: "empty version".to_string(),
        });
    }

    // プレリリース・ビルドメタデータより前の数値部分だけを補完する
    let split_at = body.find(['-', '+']).unwrap_or(body.len());
    let (core, suffix) = body.split_at(split_at);
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let normalized = format!("{}{}", parts.join("."), suffix);

    Version::parse(&normalized).map_err(|e| DeclarationError::InvalidVersion {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

/// 2つのバージョンラベルを比較
pub fn compare_versions(left: &str, right: &str) -> Result<Ordering, DeclarationError> {
    Ok(parse_version(left)?.cmp(&parse_version(right)?))
}

/// 候補バージョンが保存済みバージョンより新しいかどうか
///
/// # Arguments
///
/// * `candidate` - 宣言バージョン
/// * `stored` - 台帳のバージョン
pub fn is_newer(candidate: &str, stored: &str) -> Result<bool, DeclarationError> {
    Ok(compare_versions(candidate, stored)? == Ordering::Greater)
}

/// バージョンラベルを昇順に並べ替え
pub fn sort_versions(labels: &mut [String]) -> Result<(), DeclarationError> {
    let mut keyed = Vec::with_capacity(labels.len());
    for label in labels.iter() {
        keyed.push((parse_version(label)?, label.clone()));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    for (slot, (_, label)) in labels.iter_mut().zip(keyed) {
        *slot = label;
    }
    Ok(())
}
