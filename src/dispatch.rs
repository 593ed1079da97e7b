//! Routing of decoded frames.
//!
//! High-frequency ticks are decoded here and handed straight to the
//! [`Wrapper`], skipping the general interpreter. Next-valid-id and
//! managed-accounts are decoded for the readiness barrier and then still
//! forwarded, so generic consumers observe them too. Everything else goes to
//! the [`Interpreter`] untouched.
//!
//! | Kind | Route                                                  |
//! |------|--------------------------------------------------------|
//! | 1    | price/size handler if registered, else interpreter     |
//! | 2    | `Wrapper::tick_size`                                   |
//! | 9    | barrier + interpreter                                  |
//! | 12   | `Wrapper::update_mkt_depth`                            |
//! | 15   | barrier + interpreter                                  |
//! | 46   | `Wrapper::tick_string`                                 |
//! | *    | interpreter                                            |

use crate::error::Result;
use crate::handler::{DepthUpdate, Interpreter, PriceSizeTick, TickSize, TickString, Wrapper};
use crate::protocol::{incoming, Frame};

/// Handler for the combined price/size fast path.
pub type PriceSizeHandler = Box<dyn FnMut(PriceSizeTick) + Send>;

/// Which path a frame took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Delivered to a typed callback.
    FastPath,
    /// Forwarded to the interpreter.
    Interpreted,
}

/// Barrier information extracted from a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// First request id the gateway will accept.
    NextValidId(i64),
    /// Accounts under management.
    ManagedAccounts(Vec<String>),
}

/// Result of routing one frame.
///
/// `control` is reported even when forwarding to the interpreter failed
/// afterwards.
#[derive(Debug)]
pub struct Dispatched {
    /// Message kind, when it could be parsed.
    pub kind: Option<i32>,
    pub control: Option<Control>,
    pub outcome: Result<Route>,
}

/// Per-frame router in front of the interpreter.
pub struct Router {
    wrapper: Box<dyn Wrapper>,
    interpreter: Box<dyn Interpreter>,
    price_size_tick: Option<PriceSizeHandler>,
}

impl Router {
    /// Create a router without a combined price/size handler.
    pub fn new(wrapper: Box<dyn Wrapper>, interpreter: Box<dyn Interpreter>) -> Self {
        Self {
            wrapper,
            interpreter,
            price_size_tick: None,
        }
    }

    /// Install the combined price/size handler.
    pub fn with_price_size_tick(mut self, handler: PriceSizeHandler) -> Self {
        self.price_size_tick = Some(handler);
        self
    }

    /// Pass the negotiated version to the interpreter and acknowledge.
    pub fn on_negotiated(&mut self, server_version: i32) {
        self.interpreter.set_server_version(server_version);
        self.wrapper.connect_ack();
    }

    /// Route one frame. Never panics on malformed input.
    pub fn route(&mut self, frame: &Frame) -> Dispatched {
        let kind = match frame.kind() {
            Ok(kind) => kind,
            Err(e) => {
                return Dispatched {
                    kind: None,
                    control: None,
                    outcome: Err(e),
                }
            }
        };

        let (control, outcome) = match kind {
            incoming::TICK_PRICE if self.price_size_tick.is_some() => {
                (None, self.price_size(frame).map(|_| Route::FastPath))
            }
            incoming::TICK_SIZE => (None, self.tick_size(frame).map(|_| Route::FastPath)),
            incoming::MARKET_DEPTH => (None, self.depth(frame).map(|_| Route::FastPath)),
            incoming::TICK_STRING => (None, self.tick_string(frame).map(|_| Route::FastPath)),
            incoming::NEXT_VALID_ID => self.intercept(frame, next_valid_id),
            incoming::MANAGED_ACCOUNTS => self.intercept(frame, managed_accounts),
            _ => (None, self.interpret(frame)),
        };

        Dispatched {
            kind: Some(kind),
            control,
            outcome,
        }
    }

    /// Decode barrier data, then forward the frame regardless.
    fn intercept(
        &mut self,
        frame: &Frame,
        decode: fn(&Frame) -> Result<Control>,
    ) -> (Option<Control>, Result<Route>) {
        match decode(frame) {
            Ok(control) => (Some(control), self.interpret(frame)),
            Err(e) => (None, Err(e)),
        }
    }

    fn interpret(&mut self, frame: &Frame) -> Result<Route> {
        self.interpreter.interpret(frame)?;
        Ok(Route::Interpreted)
    }

    // kind, version, req id, tick type, price, size, attributes
    fn price_size(&mut self, frame: &Frame) -> Result<()> {
        frame.expect_len(7)?;
        let tick = PriceSizeTick {
            req_id: frame.parse(2)?,
            tick_type: frame.parse(3)?,
            price: frame.parse(4)?,
            size: frame.parse(5)?,
        };
        if let Some(handler) = self.price_size_tick.as_mut() {
            handler(tick);
        }
        Ok(())
    }

    // kind, version, req id, tick type, size
    fn tick_size(&mut self, frame: &Frame) -> Result<()> {
        frame.expect_len(5)?;
        self.wrapper.tick_size(TickSize {
            req_id: frame.parse(2)?,
            tick_type: frame.parse(3)?,
            size: frame.parse(4)?,
        });
        Ok(())
    }

    // kind, version, req id, position, operation, side, price, size
    fn depth(&mut self, frame: &Frame) -> Result<()> {
        frame.expect_len(8)?;
        self.wrapper.update_mkt_depth(DepthUpdate {
            req_id: frame.parse(2)?,
            position: frame.parse(3)?,
            operation: frame.parse(4)?,
            side: frame.parse(5)?,
            price: frame.parse(6)?,
            size: frame.parse(7)?,
        });
        Ok(())
    }

    // kind, version, req id, tick type, value
    fn tick_string(&mut self, frame: &Frame) -> Result<()> {
        frame.expect_len(5)?;
        self.wrapper.tick_string(TickString {
            req_id: frame.parse(2)?,
            tick_type: frame.parse(3)?,
            value: frame.str(4)?.to_string(),
        });
        Ok(())
    }
}

// kind, version, id
fn next_valid_id(frame: &Frame) -> Result<Control> {
    frame.expect_len(3)?;
    Ok(Control::NextValidId(frame.parse(2)?))
}

// kind, version, comma separated accounts
fn managed_accounts(frame: &Frame) -> Result<Control> {
    frame.expect_len(3)?;
    let accounts = frame
        .str(2)?
        .split(',')
        .map(str::to_string)
        .collect();
    Ok(Control::ManagedAccounts(accounts))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::sync::{Arc, Mutex};

    /// Everything a test consumer observed, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Seen {
        Size(TickSize),
        Str(TickString),
        Depth(DepthUpdate),
        PriceSize(PriceSizeTick),
        Ack,
        Version(i32),
        Interpreted(String),
    }

    pub(crate) type Log = Arc<Mutex<Vec<Seen>>>;

    pub(crate) struct Recorder(pub(crate) Log);

    impl Wrapper for Recorder {
        fn tick_size(&mut self, tick: TickSize) {
            self.0.lock().unwrap().push(Seen::Size(tick));
        }
        fn tick_string(&mut self, tick: TickString) {
            self.0.lock().unwrap().push(Seen::Str(tick));
        }
        fn update_mkt_depth(&mut self, update: DepthUpdate) {
            self.0.lock().unwrap().push(Seen::Depth(update));
        }
        fn connect_ack(&mut self) {
            self.0.lock().unwrap().push(Seen::Ack);
        }
    }

    pub(crate) struct RecordingInterpreter(pub(crate) Log);

    impl Interpreter for RecordingInterpreter {
        fn interpret(&mut self, frame: &Frame) -> Result<()> {
            if frame.str(1)? == "fail" {
                return Err(ClientError::Decode("interpreter rejected frame".into()));
            }
            self.0.lock().unwrap().push(Seen::Interpreted(frame.to_string()));
            Ok(())
        }
        fn set_server_version(&mut self, version: i32) {
            self.0.lock().unwrap().push(Seen::Version(version));
        }
    }

    pub(crate) fn recording_router() -> (Router, Log) {
        let log: Log = Arc::default();
        let router = Router::new(
            Box::new(Recorder(log.clone())),
            Box::new(RecordingInterpreter(log.clone())),
        );
        (router, log)
    }

    fn take(log: &Log) -> Vec<Seen> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_tick_size_fast_path() {
        let (mut router, log) = recording_router();
        let dispatched = router.route(&Frame::from_strs(&["2", "6", "1001", "5", "300"]));

        assert_eq!(dispatched.outcome.unwrap(), Route::FastPath);
        assert_eq!(
            take(&log),
            vec![Seen::Size(TickSize { req_id: 1001, tick_type: 5, size: 300 })]
        );
    }

    #[test]
    fn test_depth_and_string_fast_paths() {
        let (mut router, log) = recording_router();

        router.route(&Frame::from_strs(&["12", "1", "7", "0", "1", "1", "99.25", "400"]));
        router.route(&Frame::from_strs(&["46", "6", "7", "45", "1700000000"]));

        assert_eq!(
            take(&log),
            vec![
                Seen::Depth(DepthUpdate {
                    req_id: 7,
                    position: 0,
                    operation: 1,
                    side: 1,
                    price: 99.25,
                    size: 400,
                }),
                Seen::Str(TickString {
                    req_id: 7,
                    tick_type: 45,
                    value: "1700000000".into(),
                }),
            ]
        );
    }

    #[test]
    fn test_price_tick_without_handler_is_interpreted() {
        let (mut router, log) = recording_router();
        let frame = Frame::from_strs(&["1", "6", "7", "1", "101.5", "200", "0"]);

        assert_eq!(router.route(&frame).outcome.unwrap(), Route::Interpreted);
        assert_eq!(take(&log), vec![Seen::Interpreted("1,6,7,1,101.5,200,0".into())]);
    }

    #[test]
    fn test_price_tick_with_handler_is_fast_pathed() {
        let (router, log) = recording_router();
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();
        let mut router = router.with_price_size_tick(Box::new(move |tick| {
            sink.lock().unwrap().push(tick);
        }));

        let frame = Frame::from_strs(&["1", "6", "7", "1", "101.5", "200", "0"]);
        assert_eq!(router.route(&frame).outcome.unwrap(), Route::FastPath);

        assert!(take(&log).is_empty());
        assert_eq!(
            *ticks.lock().unwrap(),
            vec![PriceSizeTick { req_id: 7, tick_type: 1, price: 101.5, size: 200 }]
        );
    }

    #[test]
    fn test_barrier_kinds_are_reported_and_forwarded() {
        let (mut router, log) = recording_router();

        let id = router.route(&Frame::from_strs(&["9", "1", "17"]));
        assert_eq!(id.control, Some(Control::NextValidId(17)));
        assert_eq!(id.outcome.unwrap(), Route::Interpreted);

        let accounts = router.route(&Frame::from_strs(&["15", "1", "DU1234,DU5678"]));
        assert_eq!(
            accounts.control,
            Some(Control::ManagedAccounts(vec!["DU1234".into(), "DU5678".into()]))
        );

        assert_eq!(
            take(&log),
            vec![
                Seen::Interpreted("9,1,17".into()),
                Seen::Interpreted("15,1,DU1234,DU5678".into()),
            ]
        );
    }

    #[test]
    fn test_control_survives_interpreter_failure() {
        let (mut router, _log) = recording_router();
        let dispatched = router.route(&Frame::from_strs(&["9", "fail", "3"]));

        assert_eq!(dispatched.control, Some(Control::NextValidId(3)));
        assert!(dispatched.outcome.is_err());
    }

    #[test]
    fn test_other_kinds_are_interpreted_verbatim() {
        let (mut router, log) = recording_router();
        let dispatched = router.route(&Frame::from_strs(&["4", "2", "-1", "2104", "farm OK"]));

        assert_eq!(dispatched.kind, Some(4));
        assert_eq!(dispatched.outcome.unwrap(), Route::Interpreted);
        assert_eq!(take(&log), vec![Seen::Interpreted("4,2,-1,2104,farm OK".into())]);
    }

    #[test]
    fn test_malformed_frames_fail_without_side_effects() {
        let (mut router, log) = recording_router();

        let bad_kind = router.route(&Frame::from_strs(&["abc", "1"]));
        assert_eq!(bad_kind.kind, None);
        assert!(bad_kind.outcome.is_err());

        let bad_arity = router.route(&Frame::from_strs(&["2", "6", "1001", "5"]));
        assert!(bad_arity.outcome.is_err());

        let bad_number =
            router.route(&Frame::from_strs(&["12", "1", "7", "0", "1", "1", "x", "400"]));
        assert!(bad_number.outcome.is_err());

        let empty = router.route(&Frame::default());
        assert!(empty.outcome.is_err());

        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_on_negotiated() {
        let (mut router, log) = recording_router();
        router.on_negotiated(151);
        assert_eq!(take(&log), vec![Seen::Version(151), Seen::Ack]);
    }
}
