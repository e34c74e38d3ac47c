use serde::Deserialize;
use std::collections::HashMap;

/// Read-only client for the catalog service. Lookups decorate booking
/// listings with display images and are strictly best-effort: any failure
/// degrades to "no image", never to an error.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrek {
    name: String,
    #[serde(default)]
    image: Option<String>,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        Self { http, base_url }
    }

    pub fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub async fn image_for(&self, trek_name: &str) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let name = trek_name.trim();
        if name.is_empty() {
            return None;
        }

        let resp = self
            .http
            .get(format!("{base}/treks"))
            .query(&[("name", name)])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }

        let treks: Vec<CatalogTrek> = resp.json().await.ok()?;
        treks
            .into_iter()
            .find(|t| t.name == name)
            .and_then(|t| t.image)
    }

    /// One lookup per distinct name; misses simply stay absent from the map.
    pub async fn images_for(&self, names: &[String]) -> HashMap<String, String> {
        let mut out = HashMap::new();
        if !self.enabled() {
            return out;
        }
        for name in names {
            if out.contains_key(name) {
                continue;
            }
            if let Some(image) = self.image_for(name).await {
                out.insert(name.clone(), image);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_mock_catalog(response_body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let response_body = response_body.to_string();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut tmp = [0u8; 2048];
            let _ = stream.read(&mut tmp).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response_body.len(),
                response_body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.flush().await;
        });

        format!("http://{}", addr)
    }

    fn http() -> reqwest::Client {
        reqwest::Client::builder().build().expect("http client")
    }

    #[tokio::test]
    async fn resolves_image_by_exact_name() {
        let base = spawn_mock_catalog(
            "[{\"id\":12,\"name\":\"Annapurna Base Camp\",\"price\":5000,\"image\":\"/img/abc.jpg\"}]",
        )
        .await;
        let catalog = CatalogClient::new(http(), Some(base));

        let image = catalog.image_for("Annapurna Base Camp").await;
        assert_eq!(image.as_deref(), Some("/img/abc.jpg"));
    }

    #[tokio::test]
    async fn missing_trek_yields_no_image() {
        let base = spawn_mock_catalog("[]").await;
        let catalog = CatalogClient::new(http(), Some(base));

        assert!(catalog.image_for("Unknown Ridge").await.is_none());
    }

    #[tokio::test]
    async fn unconfigured_client_is_disabled() {
        let catalog = CatalogClient::new(http(), None);
        assert!(!catalog.enabled());
        assert!(catalog.image_for("Annapurna Base Camp").await.is_none());
        assert!(catalog.images_for(&["A".to_string()]).await.is_empty());
    }
}
