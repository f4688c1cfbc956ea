// 导出 OpenAPI JSON（无需启动服务），便于前端/SDK 代码生成
// 用法：cargo run --example dump_openapi [输出路径，默认 sdk/openapi.json]

use std::path::PathBuf;

use poster_backend::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sdk/openapi.json"));

    let json = serde_json::to_string_pretty(&ApiDoc::openapi())?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    // 直接写入 UTF-8 文件，避免 PowerShell 重定向编码问题
    std::fs::write(&out, json)?;
    println!("wrote {}", out.display());
    Ok(())
}
