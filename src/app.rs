use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config;
use crate::data::{self, CommentService, FeedService};
use crate::feed;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let comment_service: Arc<dyn CommentService>;
    let feed_service: Arc<dyn FeedService>;
    let status: String;

    if cfg.api.enabled {
        let client = Arc::new(api_client(&cfg).context("initialize feed client")?);
        comment_service = Arc::new(data::HttpCommentService::new(client));
        // No live feed endpoint yet; posts still come bundled.
        feed_service = Arc::new(data::SampleFeedService);
        status = format!(
            "Connected to {}. j/k scroll, Tab select, l like, c comments, t top, q quit.",
            cfg.api.base_url
        );
    } else {
        comment_service = Arc::new(data::SampleCommentService);
        feed_service = Arc::new(data::SampleFeedService);
        status =
            "Browsing the sample feed. j/k scroll, Tab select, l like, c comments, t top, q quit."
                .to_string();
    }

    let posts = feed_service.load_feed().context("load feed")?;

    let options = ui::Options {
        status_message: status,
        posts,
        comment_service,
        config: cfg.ui,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn api_client(cfg: &config::Config) -> Result<feed::Client> {
    feed::Client::new(feed::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
}

/// One-shot profile lookup for `--whois`, bypassing the TUI.
pub fn show_user(username: &str) -> Result<()> {
    use crate::data::UserService;
    use crate::ui::format_timestamp;

    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let client = Arc::new(api_client(&cfg).context("initialize feed client")?);
    let service = data::HttpUserService::new(client);
    let user = service.user(username)?;

    println!("{}", user.username);
    println!("Joined on {}", format_timestamp(user.created_on));
    if !user.bio.trim().is_empty() {
        println!("{}", user.bio);
    }
    for link in &user.links {
        println!("{link}");
    }
    Ok(())
}
