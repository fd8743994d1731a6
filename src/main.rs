use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mediafetch::core::{ChannelInfoItem, CommentsInfoItem, PlaylistInfoItem};
use mediafetch::list::SearchExtractor;
use mediafetch::{
    Extractor, ExtractorContext, HttpDownloader, InfoItem, LinkType, ListExtractor, ListInfo,
    Localization, Page, StreamInfo, StreamInfoItem, StreamingService, collect_pages,
    service_by_name, service_by_url,
};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "mediafetch",
    about = "Extract metadata and streams from video and audio platforms",
    long_about = "Extract metadata, listings and playable streams from YouTube and SoundCloud.\n\n\
    Examples:\n\
      mediafetch https://www.youtube.com/watch?v=dQw4w9WgXcQ       # Stream info\n\
      mediafetch https://soundcloud.com/user/sets/mix --pages 3    # First three pages of a playlist\n\
      mediafetch --search \"rust conf\" --service youtube           # Search\n\
      mediafetch --kiosk --country DE                              # Trending in Germany\n\
      mediafetch --json https://www.youtube.com/@rustlang          # Channel as JSON"
)]
struct Args {
    /// URL of a stream, channel or playlist
    #[arg(required_unless_present_any = ["search", "kiosk"])]
    url: Option<String>,

    /// Search instead of opening a URL
    #[arg(short = 's', long = "search")]
    search: Option<String>,

    /// Open a kiosk such as Trending (the service's default when no id is given)
    #[arg(short = 'k', long = "kiosk", num_args = 0..=1, default_missing_value = "")]
    kiosk: Option<String>,

    /// Service to search on or read kiosks from
    #[arg(long = "service", default_value = "YouTube")]
    service: String,

    /// Search content filter (for example videos, channels, tracks)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Pages to read from listings
    #[arg(short = 'p', long = "pages", default_value_t = 1)]
    pages: usize,

    /// Content language, e.g. en or pt-BR
    #[arg(long = "lang", default_value = "en")]
    lang: String,

    /// Content country, e.g. GB
    #[arg(long = "country")]
    country: Option<String>,

    /// Print JSON instead of a summary
    #[arg(long = "json")]
    json: bool,

    /// Also list comments (streams only)
    #[arg(long = "comments")]
    comments: bool,
}

fn format_duration(seconds: i64) -> String {
    if seconds < 0 {
        return "?".to_string();
    }
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

trait Summary {
    fn summary(&self) -> String;
}

impl Summary for StreamInfoItem {
    fn summary(&self) -> String {
        format!(
            "{} [{}] {}\n    {}",
            self.name,
            format_duration(self.duration),
            self.uploader_name.as_deref().unwrap_or(""),
            self.url
        )
    }
}

impl Summary for PlaylistInfoItem {
    fn summary(&self) -> String {
        format!("playlist: {} ({} items)\n    {}", self.name, self.stream_count, self.url)
    }
}

impl Summary for ChannelInfoItem {
    fn summary(&self) -> String {
        format!("channel: {} ({} subscribers)\n    {}", self.name, self.subscriber_count, self.url)
    }
}

impl Summary for CommentsInfoItem {
    fn summary(&self) -> String {
        format!("{}: {}", self.name, self.comment_text)
    }
}

impl Summary for InfoItem {
    fn summary(&self) -> String {
        match self {
            InfoItem::Stream(i) => i.summary(),
            InfoItem::Playlist(i) => i.summary(),
            InfoItem::Channel(i) => i.summary(),
            InfoItem::Comment(i) => i.summary(),
        }
    }
}

fn print_list<T: Summary + Serialize>(info: &ListInfo<T>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }
    println!("{} ({})", info.name, info.url);
    println!();
    for (index, item) in info.page.items.iter().enumerate() {
        println!("[{}] {}", index + 1, item.summary());
    }
    if !info.page.errors.is_empty() {
        println!();
        println!("{} record(s) could not be read:", info.page.errors.len());
        for e in &info.page.errors {
            println!("  {e}");
        }
    }
    if info.page.has_next_page() {
        println!();
        println!("More available, use --pages to read further.");
    }
    Ok(())
}

fn print_stream(info: &StreamInfo, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }
    println!("{}", info.name);
    println!("  Platform: {}", info.platform);
    println!("  Uploader: {}", info.uploader_name.as_deref().unwrap_or("?"));
    println!("  Duration: {}", format_duration(info.duration));
    println!("  Views: {}", info.view_count);
    println!();
    for audio in &info.audio_streams {
        println!("  audio {} {}kbps\n    {}", audio.format, audio.average_bitrate, audio.url);
    }
    for video in info.video_streams.iter().chain(&info.video_only_streams) {
        let kind = if video.is_video_only { "video-only" } else { "video" };
        println!("  {kind} {} {} {}fps\n    {}", video.format, video.resolution, video.fps, video.url);
    }
    if let Some(url) = &info.hls_url {
        println!("  hls\n    {url}");
    }
    if let Some(url) = &info.dash_mpd_url {
        println!("  dash\n    {url}");
    }
    for subtitles in &info.subtitles {
        println!("  subtitles {} {}", subtitles.language_tag, subtitles.format);
    }
    Ok(())
}

/// Fetch a listing and read up to `pages` pages of it.
async fn read_list<T, E>(extractor: &mut E, pages: usize) -> Result<ListInfo<T>>
where
    T: Send,
    E: ListExtractor<T> + ?Sized,
{
    extractor.fetch_page().await?;
    let page: Page<T> = collect_pages(extractor, Some(pages)).await?;
    Ok(ListInfo {
        platform: extractor.platform(),
        id: extractor.id().to_string(),
        url: extractor.url().to_string(),
        name: extractor.name()?,
        page,
    })
}

async fn run(args: Args) -> Result<()> {
    let mut localization =
        Localization::from_tag(&args.lang).with_context(|| format!("bad --lang {}", args.lang))?;
    if let Some(country) = &args.country {
        localization = Localization::new(&localization.language_code, Some(country.as_str()));
    }
    let downloader = HttpDownloader::new().context("could not build the HTTP client")?;
    let ctx = ExtractorContext::new(Arc::new(downloader)).with_localization(localization);

    if let Some(query) = &args.search {
        let service = service_by_name(&args.service)?;
        let mut extractor = service.search_extractor(query, &args.filters, &ctx)?;
        let info = read_list::<InfoItem, _>(extractor.as_mut(), args.pages).await?;
        if !args.json
            && let Ok(suggestion) = extractor.search_suggestion()
            && !suggestion.is_empty()
        {
            println!("Did you mean: {suggestion}");
        }
        return print_list(&info, args.json);
    }

    if let Some(kiosk) = &args.kiosk {
        let service = service_by_name(&args.service)?;
        let kiosk_id = match kiosk.as_str() {
            "" => service
                .default_kiosk()
                .with_context(|| format!("{} has no kiosks", service.name()))?,
            id => id,
        };
        let mut extractor = service.kiosk_extractor(kiosk_id, &ctx)?;
        let info = read_list::<StreamInfoItem, _>(extractor.as_mut(), args.pages).await?;
        return print_list(&info, args.json);
    }

    let Some(url) = &args.url else {
        bail!("a URL, --search or --kiosk is required");
    };
    let service = service_by_url(url)?;
    match service.link_type(url) {
        LinkType::Stream => {
            let mut extractor = service.stream_extractor(url, &ctx)?;
            let info = StreamInfo::fetch(extractor.as_mut()).await?;
            print_stream(&info, args.json)?;
            if args.comments {
                let mut comments = service.comments_extractor(url, &ctx)?;
                let info = read_list::<CommentsInfoItem, _>(comments.as_mut(), args.pages).await?;
                print_list(&info, args.json)?;
            }
            Ok(())
        }
        LinkType::Channel => {
            let mut extractor = service.channel_extractor(url, &ctx)?;
            let info = read_list::<StreamInfoItem, _>(extractor.as_mut(), args.pages).await?;
            print_list(&info, args.json)
        }
        LinkType::Playlist => {
            let mut extractor = service.playlist_extractor(url, &ctx)?;
            let info = read_list::<StreamInfoItem, _>(extractor.as_mut(), args.pages).await?;
            print_list(&info, args.json)
        }
        LinkType::None => bail!("{} does not recognise {url}", service.name()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    run(Args::parse()).await
}
