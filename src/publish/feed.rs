//! RSS 2.0 feed generation from the episode store.
//!
//! The feed is derived data: every build lists the store from scratch and
//! rewrites the whole document. Nothing is cached between builds.

use crate::config::{ChannelConfig, Config};
use crate::defaults;
use crate::error::{BriefcastError, Result};
use crate::publish::store::EpisodeStore;
use crate::sys;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// File size in bytes
    pub length: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// The audio filename, stable across rebuilds
    pub guid: String,
    pub title: String,
    pub description: String,
    pub enclosure: Enclosure,
    pub published: DateTime<Utc>,
}

/// A fully resolved feed, newest entry first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub channel: ChannelConfig,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    /// Date of the newest entry; the document carries no wall-clock time.
    pub fn last_build_date(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|e| e.published).max()
    }

    /// Serialize to an RSS 2.0 document with the iTunes namespace.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        let ch = &self.channel;

        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        w.write_event(Event::Start(
            BytesStart::new("rss").with_attributes([("version", "2.0"), ("xmlns:itunes", ITUNES_NS)]),
        ))
        .map_err(xml_err)?;
        start(&mut w, "channel")?;

        text_element(&mut w, "title", &ch.title)?;
        text_element(&mut w, "link", &ch.link)?;
        text_element(&mut w, "description", &ch.description)?;
        text_element(&mut w, "language", &ch.language)?;
        if let Some(date) = self.last_build_date() {
            text_element(&mut w, "lastBuildDate", &date.to_rfc2822())?;
        }
        text_element(&mut w, "generator", concat!("briefcast ", env!("CARGO_PKG_VERSION")))?;

        if let Some(author) = &ch.author {
            text_element(&mut w, "itunes:author", author)?;
        }
        if ch.author.is_some() || ch.email.is_some() {
            start(&mut w, "itunes:owner")?;
            if let Some(author) = &ch.author {
                text_element(&mut w, "itunes:name", author)?;
            }
            if let Some(email) = &ch.email {
                text_element(&mut w, "itunes:email", email)?;
            }
            end(&mut w, "itunes:owner")?;
        }
        if let Some(image) = &ch.image {
            empty(&mut w, BytesStart::new("itunes:image").with_attributes([("href", image.as_str())]))?;
        }
        if !ch.category.is_empty() {
            empty(
                &mut w,
                BytesStart::new("itunes:category").with_attributes([("text", ch.category.as_str())]),
            )?;
        }
        text_element(&mut w, "itunes:explicit", "false")?;

        for entry in &self.entries {
            start(&mut w, "item")?;
            text_element(&mut w, "title", &entry.title)?;
            text_element(&mut w, "description", &entry.description)?;
            w.write_event(Event::Start(
                BytesStart::new("guid").with_attributes([("isPermaLink", "false")]),
            ))
            .map_err(xml_err)?;
            w.write_event(Event::Text(BytesText::new(&entry.guid)))
                .map_err(xml_err)?;
            end(&mut w, "guid")?;
            let length = entry.enclosure.length.to_string();
            empty(
                &mut w,
                BytesStart::new("enclosure").with_attributes([
                    ("url", entry.enclosure.url.as_str()),
                    ("length", length.as_str()),
                    ("type", entry.enclosure.mime_type.as_str()),
                ]),
            )?;
            text_element(&mut w, "pubDate", &entry.published.to_rfc2822())?;
            end(&mut w, "item")?;
        }

        end(&mut w, "channel")?;
        end(&mut w, "rss")?;

        let mut bytes = w.into_inner().into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

fn xml_err<E: std::fmt::Display>(e: E) -> BriefcastError {
    BriefcastError::Feed {
        message: format!("XML write failed: {}", e),
    }
}

fn start<W: Write>(w: &mut Writer<W>, name: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)
}

fn end<W: Write>(w: &mut Writer<W>, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

fn empty<W: Write>(w: &mut Writer<W>, element: BytesStart<'_>) -> Result<()> {
    w.write_event(Event::Empty(element)).map_err(xml_err)
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    start(w, name)?;
    w.write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    end(w, name)
}

/// Parse the UTC instant embedded in `episode_<YYYYMMDDTHHMMSSZ>.mp3`.
pub fn parse_episode_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let rest = filename.strip_prefix(defaults::EPISODE_PREFIX)?;
    let (stamp, ext) = rest.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case(defaults::AUDIO_EXTENSION) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, defaults::TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Builds the feed document for one store.
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    store: EpisodeStore,
    channel: ChannelConfig,
    base_url: String,
    output: PathBuf,
}

impl FeedBuilder {
    pub fn new(
        store: EpisodeStore,
        channel: ChannelConfig,
        base_url: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            channel,
            base_url: base_url.into(),
            output: output.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EpisodeStore::new(&config.store.dir),
            config.channel.clone(),
            config.store.base_url.clone(),
            config.store.feed_path.clone(),
        )
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Read the store into a [`Feed`], newest filename first.
    pub fn collect(&self) -> Result<Feed> {
        let mut names = self.store.list_episodes().map_err(|e| BriefcastError::Feed {
            message: format!("Failed to list {}: {}", self.store.dir().display(), e),
        })?;
        names.sort_by(|a, b| b.cmp(a));

        let base = self.base_url.trim_end_matches('/');
        let mut entries = Vec::with_capacity(names.len());

        for name in names {
            let path = self.store.path_of(&name);
            let file_meta = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable episode");
                    continue;
                }
            };

            let published = match parse_episode_timestamp(&name) {
                Some(ts) => ts,
                None => match file_meta.modified() {
                    Ok(mtime) => DateTime::<Utc>::from(mtime),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "No modification time, using epoch");
                        DateTime::<Utc>::UNIX_EPOCH
                    }
                },
            };

            let metadata = self.store.load_metadata(&name);
            let url = metadata
                .mp3_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| format!("{}/{}", base, name));

            entries.push(FeedEntry {
                title: metadata
                    .title
                    .unwrap_or_else(|| format!("Episode: {}", name)),
                description: metadata
                    .description
                    .unwrap_or_else(|| format!("New automated episode ({}).", name)),
                enclosure: Enclosure {
                    url,
                    length: file_meta.len(),
                    mime_type: defaults::AUDIO_MIME.to_string(),
                },
                published,
                guid: name,
            });
        }

        let mut channel = self.channel.clone();
        channel.link = self.channel.resolved_link(&self.base_url).to_string();

        Ok(Feed { channel, entries })
    }

    /// Regenerate the feed document, replacing any previous version.
    pub fn build(&self) -> Result<PathBuf> {
        let feed = self.collect()?;
        let xml = feed.to_xml()?;
        write_replacing(&self.output, &xml)?;
        info!(
            path = %self.output.display(),
            entries = feed.entries.len(),
            "Feed rebuilt"
        );
        Ok(self.output.clone())
    }
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let feed_err = |e: std::io::Error| BriefcastError::Feed {
        message: format!("Failed to write {}: {}", path.display(), e),
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(feed_err)?;
    let mut temp =
        sys::staging_file(&dir, ".tmp", sys::shared_permissions().as_ref()).map_err(feed_err)?;
    temp.write_all(bytes).map_err(feed_err)?;
    temp.persist(path).map_err(|e| feed_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::{Duration, SystemTime};

    fn builder(dir: &Path) -> FeedBuilder {
        FeedBuilder::new(
            EpisodeStore::new(dir.join("episodes")),
            ChannelConfig::default(),
            "http://localhost:8000",
            dir.join("podcast.xml"),
        )
    }

    fn add_episode(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let episodes = dir.join("episodes");
        fs::create_dir_all(&episodes).unwrap();
        let path = episodes.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_episode_timestamp() {
        assert_eq!(
            parse_episode_timestamp("episode_20260106T052419Z.mp3"),
            Some(Utc.with_ymd_and_hms(2026, 1, 6, 5, 24, 19).unwrap())
        );
        assert_eq!(
            parse_episode_timestamp("episode_20260106T052419Z.MP3"),
            Some(Utc.with_ymd_and_hms(2026, 1, 6, 5, 24, 19).unwrap())
        );
        assert_eq!(parse_episode_timestamp("interview.mp3"), None);
        assert_eq!(parse_episode_timestamp("episode_2026.mp3"), None);
        assert_eq!(parse_episode_timestamp("episode_20261306T052419Z.mp3"), None);
    }

    #[test]
    fn test_entries_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260105T060000Z.mp3", b"a");
        add_episode(tmp.path(), "episode_20260107T060000Z.mp3", b"b");
        add_episode(tmp.path(), "episode_20260106T060000Z.mp3", b"c");

        let feed = builder(tmp.path()).collect().unwrap();

        let guids: Vec<&str> = feed.entries.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(
            guids,
            vec![
                "episode_20260107T060000Z.mp3",
                "episode_20260106T060000Z.mp3",
                "episode_20260105T060000Z.mp3",
            ]
        );
        assert_eq!(
            feed.last_build_date(),
            Some(Utc.with_ymd_and_hms(2026, 1, 7, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_and_corrupt_sidecars_use_filename_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260101T000000Z.mp3", b"1234");
        add_episode(tmp.path(), "episode_20260102T000000Z.mp3", b"12");
        add_episode(tmp.path(), "episode_20260102T000000Z.json", b"{ broken");

        let feed = builder(tmp.path()).collect().unwrap();

        assert_eq!(feed.entries.len(), 2);
        for entry in &feed.entries {
            assert_eq!(entry.title, format!("Episode: {}", entry.guid));
            assert_eq!(
                entry.description,
                format!("New automated episode ({}).", entry.guid)
            );
        }
        assert_eq!(feed.entries[0].enclosure.length, 2);
        assert_eq!(feed.entries[1].enclosure.length, 4);
    }

    #[test]
    fn test_enclosure_defaults_to_base_url() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");

        let feed = builder(tmp.path()).collect().unwrap();

        let enclosure = &feed.entries[0].enclosure;
        assert_eq!(
            enclosure.url,
            "http://localhost:8000/episode_20260106T052419Z.mp3"
        );
        assert_eq!(enclosure.length, 3);
        assert_eq!(enclosure.mime_type, "audio/mpeg");
    }

    #[test]
    fn test_remote_url_and_metadata_preferred() {
        let tmp = tempfile::tempdir().unwrap();
        let audio = add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");
        let store = EpisodeStore::new(tmp.path().join("episodes"));
        store
            .put_metadata(
                &audio,
                "Daily Brief: Chips",
                "All about chips.",
                Some("https://github.com/acme/pod/releases/download/automated/episode_20260106T052419Z.mp3"),
            )
            .unwrap();

        let feed = builder(tmp.path()).collect().unwrap();

        let entry = &feed.entries[0];
        assert_eq!(entry.title, "Daily Brief: Chips");
        assert_eq!(entry.description, "All about chips.");
        assert!(entry.enclosure.url.starts_with("https://github.com/acme/pod/"));
    }

    #[test]
    fn test_unparsable_name_uses_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let path = add_episode(tmp.path(), "interview.mp3", b"x");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let feed = builder(tmp.path()).collect().unwrap();

        assert_eq!(
            feed.entries[0].published,
            DateTime::<Utc>::from(mtime)
        );
    }

    #[test]
    fn test_channel_link_falls_back_to_base_url() {
        let tmp = tempfile::tempdir().unwrap();
        let feed = builder(tmp.path()).collect().unwrap();
        assert_eq!(feed.channel.link, "http://localhost:8000");
        assert!(feed.entries.is_empty());
        assert_eq!(feed.last_build_date(), None);
    }

    #[test]
    fn test_build_writes_rss_document() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");
        let mut channel = ChannelConfig::default();
        channel.author = Some("Ops & Co".to_string());
        channel.email = Some("ops@example.com".to_string());
        let builder = FeedBuilder::new(
            EpisodeStore::new(tmp.path().join("episodes")),
            channel,
            "http://localhost:8000/",
            tmp.path().join("out/podcast.xml"),
        );

        let path = builder.build().unwrap();
        let xml = fs::read_to_string(path).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\""));
        assert!(xml.contains("<title>Automated Daily Brief</title>"));
        assert!(xml.contains("<itunes:author>Ops &amp; Co</itunes:author>"));
        assert!(xml.contains("<itunes:email>ops@example.com</itunes:email>"));
        assert!(xml.contains("<itunes:category text=\"News\"/>"));
        assert!(xml.contains(
            "<enclosure url=\"http://localhost:8000/episode_20260106T052419Z.mp3\" length=\"3\" type=\"audio/mpeg\"/>"
        ));
        assert!(xml.contains("<guid isPermaLink=\"false\">episode_20260106T052419Z.mp3</guid>"));
        assert!(xml.contains("<pubDate>Tue, 6 Jan 2026 05:24:19 +0000</pubDate>"));
        assert!(xml.contains("<lastBuildDate>Tue, 6 Jan 2026 05:24:19 +0000</lastBuildDate>"));
    }

    #[test]
    fn test_collect_reflects_store_only() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");
        let builder = builder(tmp.path());

        assert_eq!(builder.collect().unwrap(), builder.collect().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_feed_document_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");

        let path = builder(tmp.path()).build().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, sys::SHARED_MODE);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        add_episode(tmp.path(), "episode_20260106T052419Z.mp3", b"abc");
        let builder = builder(tmp.path());

        let first = fs::read(builder.build().unwrap()).unwrap();
        let second = fs::read(builder.build().unwrap()).unwrap();

        assert_eq!(first, second);
    }
}
