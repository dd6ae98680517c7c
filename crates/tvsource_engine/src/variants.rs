use m3u8_rs::Playlist;
use url::Url;

use engine_logging::engine_debug;

use crate::PageFetcher;

/// Variant stream URIs of a master playlist, resolved against `playlist_url`.
///
/// Returns `None` when `body` is not a master playlist. I-frame-only variants
/// are skipped.
pub fn master_variants(body: &[u8], playlist_url: &str) -> Option<Vec<String>> {
    let Ok(Playlist::MasterPlaylist(master)) = m3u8_rs::parse_playlist_res(body) else {
        return None;
    };
    let base = Url::parse(playlist_url).ok();
    let mut variants: Vec<String> = Vec::new();
    for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
        let uri = variant.uri.trim();
        if uri.is_empty() {
            continue;
        }
        let resolved = match Url::parse(uri) {
            Ok(url) => url,
            Err(_) => match base.as_ref().and_then(|b| b.join(uri).ok()) {
                Some(url) => url,
                None => continue,
            },
        };
        let resolved = String::from(resolved);
        if !variants.contains(&resolved) {
            variants.push(resolved);
        }
    }
    Some(variants)
}

/// Puts each master playlist's variants ahead of the master itself.
///
/// Non-`m3u8` URLs and playlists that fail to download pass through as-is.
/// The output never exceeds `max_candidates`.
pub async fn expand_master_playlists(
    pages: &PageFetcher,
    urls: Vec<String>,
    max_candidates: usize,
) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for url in urls {
        if expanded.len() >= max_candidates {
            break;
        }
        if url.to_ascii_lowercase().contains(".m3u8") {
            match pages.fetch(&url).await {
                Ok(output) => {
                    if let Some(variants) = master_variants(&output.bytes, &output.metadata.final_url)
                    {
                        engine_debug!("{} is a master playlist with {} variants", url, variants.len());
                        for variant in variants {
                            if expanded.len() >= max_candidates {
                                break;
                            }
                            if !expanded.contains(&variant) {
                                expanded.push(variant);
                            }
                        }
                    }
                }
                Err(err) => engine_debug!("variant expansion skipped for {}: {}", url, err),
            }
        }
        if expanded.len() < max_candidates && !expanded.contains(&url) {
            expanded.push(url);
        }
    }
    expanded
}
