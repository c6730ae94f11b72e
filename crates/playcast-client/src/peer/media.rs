//! Inbound track aggregation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

/// Metadata of one inbound media track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    /// Stream the sender grouped this track into, if any.
    pub stream_id: Option<String>,
}

/// The presentable stream: an ordered set of tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<RemoteTrack>,
}

const AGGREGATE_ID: &str = "aggregate";

/// Holds at most one stream per session and folds tracks into it.
#[derive(Debug, Default)]
pub struct MediaAggregate {
    current: Option<MediaStream>,
}

impl MediaAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a track in and return the resulting stream.
    ///
    /// A grouped track joins its own stream, replacing a stream with a
    /// different id. An ungrouped track is appended to the current stream.
    pub fn add_track(&mut self, track: RemoteTrack) -> &MediaStream {
        let stream = match (self.current.take(), track.stream_id.clone()) {
            (Some(mut s), Some(sid)) if s.id == sid => {
                push_unique(&mut s.tracks, track);
                s
            }
            (_, Some(sid)) => MediaStream { id: sid, tracks: vec![track] },
            (Some(mut s), None) => {
                push_unique(&mut s.tracks, track);
                s
            }
            (None, None) => MediaStream { id: AGGREGATE_ID.into(), tracks: vec![track] },
        };
        self.current.insert(stream)
    }

    pub fn current(&self) -> Option<&MediaStream> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn push_unique(tracks: &mut Vec<RemoteTrack>, track: RemoteTrack) {
    if let Some(existing) = tracks.iter_mut().find(|t| t.id == track.id) {
        *existing = track;
    } else {
        tracks.push(track);
    }
}
