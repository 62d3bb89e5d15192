//! The AV2 amplifier adapter.
//!
//! [`NaimAv2`] joins the inbound path (frame reader, response decoder,
//! handler dispatch) with the outbound path (command encoder, timed sender).
//! The two paths are independent: one task can sit in [`NaimAv2::read_all`]
//! while any number of others issue commands through the same shared
//! adapter.

use std::sync::Arc;

use naim_core::error::Result;
use naim_core::transport::{TransportReader, TransportWriter};
use tokio::sync::Mutex;

use crate::commands::{Command, encode_command};
use crate::dispatch::{Dispatcher, HandlerResult};
use crate::protocol::FrameReader;
use crate::response::{
    Input, Response, ResponseKind, SystemStatus, UnknownResponse, decode_response,
};
use crate::sender::{SendTiming, TimedSender};

/// A Naim amplifier attached over an AV2 serial link.
///
/// Register handlers first, then share the adapter (typically as an
/// `Arc<NaimAv2>`) between a read task and command callers. Reads are
/// serialised on one lock and sends on another, so a blocked read never
/// delays a command.
pub struct NaimAv2 {
    reader: Mutex<FrameReader<Box<dyn TransportReader>>>,
    sender: Mutex<TimedSender<Box<dyn TransportWriter>>>,
    dispatcher: Dispatcher,
}

impl NaimAv2 {
    /// Create an adapter over a reader and writer with the default timing.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: TransportReader + 'static,
        W: TransportWriter + 'static,
    {
        Self::with_timing(reader, writer, SendTiming::default())
    }

    /// Create an adapter with a custom timing contract.
    pub fn with_timing<R, W>(reader: R, writer: W, timing: SendTiming) -> Self
    where
        R: TransportReader + 'static,
        W: TransportWriter + 'static,
    {
        Self::from_parts(Box::new(reader), Box::new(writer), timing, Dispatcher::new())
    }

    pub(crate) fn from_parts(
        reader: Box<dyn TransportReader>,
        writer: Box<dyn TransportWriter>,
        timing: SendTiming,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            reader: Mutex::new(FrameReader::new(reader)),
            sender: Mutex::new(TimedSender::new(writer, timing)),
            dispatcher,
        }
    }

    /// Wrap the adapter for sharing between tasks.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // -----------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------

    /// Register a handler for system status responses.
    pub fn add_system_status_handler<F>(&mut self, handler: F)
    where
        F: Fn(&SystemStatus) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_system_status(handler);
    }

    /// Register a handler for responses with an unmodelled message type.
    pub fn add_unknown_response_handler<F>(&mut self, handler: F)
    where
        F: Fn(&UnknownResponse) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_unknown(handler);
    }

    /// Remove every registered handler of both kinds.
    pub fn clear_handlers(&mut self) {
        self.dispatcher.clear(ResponseKind::SystemStatus);
        self.dispatcher.clear(ResponseKind::Unknown);
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: ResponseKind) -> usize {
        self.dispatcher.handler_count(kind)
    }

    // -----------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------

    /// Read and decode the next frame without dispatching it.
    pub async fn read_response(&self) -> Result<Response> {
        let frame = self.reader.lock().await.read_frame().await;
        frame
            .and_then(|frame| decode_response(frame.code, &frame.payload))
            .inspect_err(|e| {
                if !e.is_end_of_stream() {
                    tracing::warn!(error = %e, "Discarding inbound frame");
                }
            })
    }

    /// Read one frame, decode it and hand it to the registered handlers.
    ///
    /// Frame and payload errors are returned without calling any handler.
    /// A clean end of stream is returned as
    /// [`Error::EndOfStream`](naim_core::Error::EndOfStream).
    pub async fn read(&self) -> Result<()> {
        let response = self.read_response().await?;
        tracing::debug!(code = response.code(), kind = response.kind().name(), "Received response");
        self.dispatcher.dispatch(&response)
    }

    /// Read and dispatch frames until the stream ends.
    ///
    /// Returns `Ok(())` on a clean end of stream and the first other error
    /// otherwise.
    pub async fn read_all(&self) -> Result<()> {
        loop {
            match self.read().await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => {
                    tracing::debug!("Response stream ended");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    /// Encode and transmit a command under the timing contract.
    pub async fn send_command(&self, command: Command) -> Result<()> {
        let body = encode_command(command)?;
        self.sender.lock().await.send(&body).await
    }

    /// Select an input. [`Input::Unknown`] is rejected.
    pub async fn set_input(&self, input: Input) -> Result<()> {
        self.send_command(Command::select_input(input)?).await
    }

    /// Set the volume, 0-99. Out-of-range levels are rejected before any write.
    pub async fn set_volume(&self, level: i32) -> Result<()> {
        self.send_command(Command::volume(level)?).await
    }

    /// Mute the outputs, or unmute them with `false`.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        let command = if muted { Command::MuteOn } else { Command::MuteOff };
        self.send_command(command).await
    }

    /// Put the amplifier into standby, or power it on with `false`.
    pub async fn set_standby(&self, standby: bool) -> Result<()> {
        let command = if standby { Command::Standby } else { Command::On };
        self.send_command(command).await
    }

    /// Ask the amplifier for its system status.
    ///
    /// The reply arrives through the read path like any other response.
    pub async fn query_status(&self) -> Result<()> {
        self.send_command(Command::StatusQuery).await
    }
}

impl std::fmt::Debug for NaimAv2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaimAv2")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use naim_core::error::{Error, FrameError};
    use naim_test_harness::{DeviceTimingDouble, MockReader, MockWriter};
    use naim_transport::{StreamReader, StreamWriter};
    use tokio::io::AsyncWriteExt;

    const RESPONSE_START: &[u8] = b"#AV2 ";
    const COMMAND_START: &[u8] = b"**AV2 ";

    fn response(body: &[u8]) -> Vec<u8> {
        let mut wire = RESPONSE_START.to_vec();
        wire.extend_from_slice(body);
        wire
    }

    fn command(body: &[u8]) -> Vec<u8> {
        let mut wire = COMMAND_START.to_vec();
        wire.extend_from_slice(body);
        wire
    }

    fn reading(wire: &[u8]) -> NaimAv2 {
        NaimAv2::new(MockReader::from_bytes(wire), MockWriter::new().0)
    }

    fn writing() -> (NaimAv2, naim_test_harness::SentLog) {
        let (writer, log) = MockWriter::new();
        (NaimAv2::new(MockReader::new(), writer), log)
    }

    /// Register a system status handler that records every status it sees.
    fn capture_status(amp: &mut NaimAv2) -> Arc<StdMutex<Vec<SystemStatus>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        amp.add_system_status_handler(move |status| {
            sink.lock().unwrap().push(*status);
            Ok(())
        });
        seen
    }

    // ---------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn read_failures_do_not_call_handlers() {
        let mut wire = response(&[0xff]);
        wire.extend_from_slice(b"#HAH \x69\x81\x87\xb2\x02\xff");
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x87, 0x02, 0xff]));

        let mut amp = reading(&wire);
        amp.add_system_status_handler(|_| panic!("handler called for a bad frame"));

        let err = amp.read().await.unwrap_err();
        assert!(err.to_string().contains("message below minimum length"));
        assert!(matches!(err, Error::Frame(FrameError::BelowMinimumLength { .. })));

        let err = amp.read().await.unwrap_err();
        assert!(err.to_string().contains("unexpected message start"));

        let err = amp.read().await.unwrap_err();
        assert!(err.to_string().contains("expected length"));
        assert!(matches!(
            err,
            Error::PayloadLength { code: 0x69, expected: 4, actual: 3 }
        ));

        assert!(amp.read().await.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn other_codes_skip_status_handlers() {
        let mut amp = reading(&response(&[0x01, 0x81, 0x87, 0x02, 0xff]));
        amp.add_system_status_handler(|_| panic!("wrong handler list"));
        amp.read().await.unwrap();
    }

    #[tokio::test]
    async fn read_system_status() {
        let mut wire = response(&[0x69, 0x81, 0x87, 0xb2, 0x02, 0xff]);
        wire.extend_from_slice(&response(&[0x69, 0x01, 0x87, 0xb2, 0x02, 0xff]));
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x08, 0xb2, 0x02, 0xff]));
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x08, 0x63, 0x02, 0xff]));

        let mut amp = reading(&wire);
        let seen = capture_status(&mut amp);

        for _ in 0..4 {
            amp.read().await.unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);

        assert!(seen[0].muted());
        assert_eq!(seen[0].volume(), 50);
        assert!(!seen[0].standby());
        assert_eq!(seen[0].input(), Input::Op1);

        assert!(seen[1].standby());

        assert_eq!(seen[2].input(), Input::Op2);

        assert!(!seen[3].muted());
        assert_eq!(seen[3].volume(), 99);
    }

    #[tokio::test]
    async fn read_unknown_response() {
        let mut wire = response(&[0x02, 0xff]);
        wire.extend_from_slice(&response(&[0x02, 0x12, 0x34, 0xff]));

        let mut amp = reading(&wire);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        amp.add_unknown_response_handler(move |r| {
            sink.lock().unwrap().push(r.clone());
            Ok(())
        });

        amp.read().await.unwrap();
        amp.read().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].code, 0x02);
        assert!(seen[0].payload.is_empty());
        assert_eq!(seen[1].code, 0x02);
        assert_eq!(seen[1].payload, vec![0x12, 0x34]);
    }

    #[tokio::test]
    async fn handler_failure_reaches_reader_and_next_frame_still_parses() {
        let mut wire = response(&[0x69, 0x81, 0x87, 0xb2, 0x02, 0xff]);
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x08, 0x63, 0x02, 0xff]));

        let mut amp = reading(&wire);
        amp.add_system_status_handler(|status| {
            if status.muted() {
                Err("refusing muted status".into())
            } else {
                Ok(())
            }
        });
        let seen = capture_status(&mut amp);

        let err = amp.read().await.unwrap_err();
        assert!(matches!(err, Error::Handler { kind: "system status", code: 0x69, .. }));
        assert!(seen.lock().unwrap().is_empty());

        amp.read().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_all_dispatches_every_frame_then_ends() {
        let mut wire = response(&[0x69, 0x81, 0x08, 0xb2, 0x02, 0xff]);
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x08, 0xb2, 0x02, 0xff]));

        let mut amp = reading(&wire);
        let seen = capture_status(&mut amp);

        amp.read_all().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn read_all_stops_on_error() {
        let mut wire = response(&[0x69, 0x81, 0x08, 0xb2, 0x02, 0xff]);
        wire.extend_from_slice(b"#HAH \x69\xff");
        wire.extend_from_slice(&response(&[0x69, 0x81, 0x08, 0xb2, 0x02, 0xff]));

        let mut amp = reading(&wire);
        let seen = capture_status(&mut amp);

        assert!(matches!(amp.read_all().await, Err(Error::Frame(_))));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_response_does_not_dispatch() {
        let mut amp = reading(&response(&[0x69, 0x81, 0x87, 0xb2, 0x02, 0xff]));
        amp.add_system_status_handler(|_| panic!("dispatched"));

        match amp.read_response().await.unwrap() {
            Response::SystemStatus(status) => assert_eq!(status.input(), Input::Op1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clear_handlers_empties_both_lists() {
        let mut amp = reading(&[]);
        amp.add_system_status_handler(|_| Ok(()));
        amp.add_unknown_response_handler(|_| Ok(()));
        amp.add_unknown_response_handler(|_| Ok(()));
        assert_eq!(amp.handler_count(ResponseKind::Unknown), 2);

        amp.clear_handlers();
        assert_eq!(amp.handler_count(ResponseKind::SystemStatus), 0);
        assert_eq!(amp.handler_count(ResponseKind::Unknown), 0);
    }

    // ---------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn set_input() {
        let (amp, log) = writing();

        amp.set_input(Input::Op1).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x35, 0xff]));
        log.clear();

        amp.set_input(Input::Vip2).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x30, 0xff]));
    }

    #[tokio::test(start_paused = true)]
    async fn set_input_unknown_writes_nothing() {
        let (amp, log) = writing();
        let err = amp.set_input(Input::Unknown).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(log.bytes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_volume() {
        let (amp, log) = writing();
        amp.set_volume(50).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x23, 50, 0xff]));
    }

    #[tokio::test(start_paused = true)]
    async fn set_volume_out_of_range_writes_nothing() {
        let (amp, log) = writing();

        assert!(matches!(amp.set_volume(100).await, Err(Error::VolumeOutOfRange(100))));
        assert!(matches!(amp.set_volume(-1).await, Err(Error::VolumeOutOfRange(-1))));
        assert!(log.bytes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_mute() {
        let (amp, log) = writing();

        amp.set_mute(true).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x24, 0xff]));
        log.clear();

        amp.set_mute(false).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x25, 0xff]));
    }

    #[tokio::test(start_paused = true)]
    async fn set_standby() {
        let (amp, log) = writing();

        amp.set_standby(true).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x22, 0xff]));
        log.clear();

        amp.set_standby(false).await.unwrap();
        assert_eq!(log.bytes(), command(&[0x21, 0xff]));
    }

    #[tokio::test(start_paused = true)]
    async fn query_status() {
        let (amp, log) = writing();
        amp.query_status().await.unwrap();
        assert_eq!(log.bytes(), command(&[0x69, 0xff]));
    }

    #[tokio::test(start_paused = true)]
    async fn send_timing_satisfies_device() {
        let (double, report) = DeviceTimingDouble::new();
        let amp = NaimAv2::new(MockReader::new(), double);

        for _ in 0..3 {
            amp.set_mute(true).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        for _ in 0..3 {
            amp.set_mute(true).await.unwrap();
        }

        assert_eq!(report.accepted(), 6);
        assert!(report.frames().iter().all(|f| f == &command(&[0x24, 0xff])[1..]));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_senders_never_interleave() {
        let (double, report) = DeviceTimingDouble::new();
        let amp = NaimAv2::new(MockReader::new(), double).into_shared();

        let mut tasks = Vec::new();
        for level in 0..8 {
            let amp = amp.clone();
            tasks.push(tokio::spawn(async move { amp.set_volume(level * 10).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(report.accepted(), 8);
        let mut levels: Vec<u8> = report.frames().iter().map(|f| f[6]).collect();
        levels.sort_unstable();
        assert_eq!(levels, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    // ---------------------------------------------------------------
    // Reading and writing together over a stream
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn read_task_runs_alongside_commands() {
        let (ours, theirs) = tokio::io::duplex(256);
        let (our_read, our_write) = tokio::io::split(ours);
        let (_their_read, mut their_write) = tokio::io::split(theirs);

        let mut amp = NaimAv2::new(StreamReader::new(our_read), StreamWriter::new(our_write));
        let seen = capture_status(&mut amp);
        let amp = amp.into_shared();

        let reader = tokio::spawn({
            let amp = amp.clone();
            async move { amp.read_all().await }
        });

        amp.query_status().await.unwrap();
        their_write
            .write_all(&response(&[0x69, 0x81, 0x87, 0xb2, 0x02, 0xff]))
            .await
            .unwrap();
        their_write.shutdown().await.unwrap();
        drop(their_write);

        reader.await.unwrap().unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].volume(), 50);
    }
}
