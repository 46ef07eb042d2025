//! Capture replay link.
//!
//! Plays a recorded session back through the runtime. A capture is a text
//! file with one record per line:
//!
//! ```text
//! # GAN Gen4, one R turn
//! adv name=GAN12uiM service=00000010-0000-fff7-fff6-fff5fff4fff0 mfr=0001:15bc623412ab
//! wait 120
//! notify 4161c9d466ab517cf708b7b819014662e3252c48
//! ```
//!
//! `adv` records are returned by discovery in order, `notify` records are
//! delivered as notifications, and `wait` pauses delivery for the given number
//! of milliseconds. Writes are counted and otherwise ignored.

use std::{collections::VecDeque, time::Duration};

use cubelink_client::Advertisement;
use thiserror::Error;

use crate::link::Link;

/// Errors from parsing or playing a capture.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Line could not be parsed
    #[error("line {line}: {message}")]
    Format {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Hex payload could not be decoded
    #[error("line {line}: {source}")]
    Hex {
        /// 1-based line number
        line: usize,
        /// Decoder error
        #[source]
        source: hex::FromHexError,
    },

    /// No advertisements left to discover
    #[error("capture has no more advertisements")]
    Exhausted,
}

#[derive(Debug, Clone)]
enum Record {
    Notify(Vec<u8>),
    Wait(Duration),
}

/// A [`Link`] that replays a capture.
#[derive(Debug, Clone, Default)]
pub struct ReplayLink {
    advertisements: VecDeque<Advertisement>,
    records: VecDeque<Record>,
    subscriptions: Vec<String>,
    writes: Vec<Vec<u8>>,
}

impl ReplayLink {
    /// Parse a capture.
    ///
    /// # Errors
    ///
    /// - `ReplayError::Format` for an unknown record or malformed field
    /// - `ReplayError::Hex` for an undecodable payload
    pub fn parse(capture: &str) -> Result<Self, ReplayError> {
        let mut link = Self::default();
        for (index, raw) in capture.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let mut fields = text.split_whitespace();
            match fields.next() {
                Some("adv") => link.advertisements.push_back(parse_advertisement(fields, line)?),
                Some("notify") => {
                    let payload = fields.next().ok_or_else(|| format_error(line, "missing payload"))?;
                    let frame = hex::decode(payload).map_err(|source| ReplayError::Hex { line, source })?;
                    link.records.push_back(Record::Notify(frame));
                },
                Some("wait") => {
                    let millis = fields
                        .next()
                        .and_then(|ms| ms.parse::<u64>().ok())
                        .ok_or_else(|| format_error(line, "wait needs milliseconds"))?;
                    link.records.push_back(Record::Wait(Duration::from_millis(millis)));
                },
                Some(other) => return Err(format_error(line, &format!("unknown record {other:?}"))),
                None => {},
            }
        }
        Ok(link)
    }

    /// Notifications not yet delivered.
    #[must_use]
    pub fn remaining_notifications(&self) -> usize {
        self.records.iter().filter(|r| matches!(r, Record::Notify(_))).count()
    }

    /// Frames the session wrote.
    #[must_use]
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Characteristics currently subscribed.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}

fn format_error(line: usize, message: &str) -> ReplayError {
    ReplayError::Format { line, message: message.to_owned() }
}

fn parse_advertisement<'a>(
    fields: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Advertisement, ReplayError> {
    let mut adv = Advertisement::default();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            return Err(format_error(line, &format!("expected key=value, got {field:?}")));
        };
        match key {
            "name" => adv.name = Some(value.to_owned()),
            "service" => adv.services.push(value.to_owned()),
            "mfr" => {
                let (company, data) = value
                    .split_once(':')
                    .ok_or_else(|| format_error(line, "mfr needs company:data"))?;
                let company = u16::from_str_radix(company, 16)
                    .map_err(|_| format_error(line, "company id is not hex"))?;
                let data = hex::decode(data).map_err(|source| ReplayError::Hex { line, source })?;
                adv.manufacturer_data.push((company, data));
            },
            other => return Err(format_error(line, &format!("unknown advertisement field {other:?}"))),
        }
    }
    Ok(adv)
}

impl Link for ReplayLink {
    type Error = ReplayError;

    async fn discover(&mut self) -> Result<Advertisement, Self::Error> {
        self.advertisements.pop_front().ok_or(ReplayError::Exhausted)
    }

    async fn subscribe(&mut self, _service: &str, characteristic: &str) -> Result<(), Self::Error> {
        self.subscriptions.push(characteristic.to_owned());
        Ok(())
    }

    async fn unsubscribe(&mut self, _service: &str, characteristic: &str) -> Result<(), Self::Error> {
        self.subscriptions.retain(|c| c != characteristic);
        Ok(())
    }

    async fn write(&mut self, _service: &str, _characteristic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        self.writes.push(payload.to_vec());
        Ok(())
    }

    async fn recv_notification(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.records.pop_front()? {
                Record::Wait(duration) => tokio::time::sleep(duration).await,
                Record::Notify(frame) => return Some(frame),
            }
        }
    }

    async fn disconnect(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "
        # two frames
        adv name=GAN12uiM service=00000010-0000-fff7-fff6-fff5fff4fff0 mfr=0001:15bc623412ab
        notify 00112233445566778899aabbccddeeff
        wait 250
        notify ffeeddccbbaa99887766554433221100
    ";

    #[test]
    fn parses_records() {
        let link = ReplayLink::parse(CAPTURE).unwrap();
        assert_eq!(link.advertisements.len(), 1);
        assert_eq!(link.remaining_notifications(), 2);

        let adv = &link.advertisements[0];
        assert_eq!(adv.name.as_deref(), Some("GAN12uiM"));
        assert_eq!(adv.manufacturer_data, vec![(0x0001, vec![0x15, 0xbc, 0x62, 0x34, 0x12, 0xab])]);
    }

    #[test]
    fn reports_line_numbers() {
        let err = ReplayLink::parse("adv name=x\nnotify zz\n").unwrap_err();
        assert!(matches!(err, ReplayError::Hex { line: 2, .. }));

        let err = ReplayLink::parse("\n\nscan\n").unwrap_err();
        assert!(matches!(err, ReplayError::Format { line: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_notifications() {
        let mut link = ReplayLink::parse(CAPTURE).unwrap();
        let start = tokio::time::Instant::now();

        assert!(link.recv_notification().await.is_some());
        assert!(link.recv_notification().await.is_some());
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert!(link.recv_notification().await.is_none());
    }

    #[tokio::test]
    async fn discovery_runs_out() {
        let mut link = ReplayLink::parse(CAPTURE).unwrap();
        assert!(link.discover().await.is_ok());
        assert!(matches!(link.discover().await, Err(ReplayError::Exhausted)));
    }
}
