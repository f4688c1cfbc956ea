use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次请求重复创建。
///
/// 说明：
/// - 远程素材目录与图床上传使用同一个 client，超时在单次请求上设置；
/// - `Client` 本身是线程安全的，适合全局复用。
static CLIENT: OnceCell<Client> = OnceCell::new();

/// 连接阶段超时；读写超时由调用方按配置设置。
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 获取共享的 HTTP Client
pub fn shared_client() -> Result<&'static Client, reqwest::Error> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("poster-backend/", env!("CARGO_PKG_VERSION")))
            .build()
    })
}
