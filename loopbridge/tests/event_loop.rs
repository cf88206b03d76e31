mod common;

use common::Pipe;
use loopbridge::{
    Arm, Error, EventLoop, EventLoopBuilder, Hook, HookContext, Interest, Readiness, Watch,
};
use std::cell::RefCell;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Arms `fd` on its first `before_poll` and records everything it sees.
struct Recorder {
    fd: Option<RawFd>,
    interest: Interest,
    timeout: Option<Duration>,
    watch: Option<Watch>,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn new(fd: Option<RawFd>, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            fd,
            interest: Interest::READ,
            timeout: None,
            watch: None,
            log: log.clone(),
        }
    }
}

impl Hook for Recorder {
    fn before_poll(&mut self, cx: &mut HookContext<'_>) -> loopbridge::Result<Option<Duration>> {
        self.log.borrow_mut().push("before".to_string());

        if let (Some(fd), None) = (self.fd, &self.watch) {
            self.watch = Some(cx.arm(fd, self.interest, 7)?);
        }

        Ok(self.timeout)
    }

    fn on_ready(&mut self, key: usize, readiness: Readiness) {
        self.log.borrow_mut().push(format!(
            "ready {key} r={} w={}",
            readiness.readable, readiness.writable
        ));
    }

    fn after_poll(&mut self) {
        self.log.borrow_mut().push("after".to_string());
    }
}

#[test]
fn hooks_run_around_poll() {
    let mut event_loop = EventLoop::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    event_loop.insert_hook(Recorder::new(None, &log));
    event_loop.turn(Some(Duration::ZERO)).unwrap();

    assert_eq!(*log.borrow(), vec!["before", "after"]);
}

#[test]
fn ready_watch_is_delivered_with_key() {
    let pipe = Pipe::new();
    let mut event_loop = EventLoop::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    event_loop.insert_hook(Recorder::new(Some(pipe.reader), &log));

    event_loop.turn(Some(Duration::ZERO)).unwrap();
    assert_eq!(*log.borrow(), vec!["before", "after"]);
    assert!(event_loop.handle().is_armed(pipe.reader));

    pipe.write(b"ping");
    log.borrow_mut().clear();
    event_loop.turn(Some(Duration::from_secs(5))).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["before", "ready 7 r=true w=false", "after"]
    );
}

#[test]
fn removing_hook_disarms_its_watches() {
    let pipe = Pipe::new();
    let mut event_loop = EventLoop::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let handle = event_loop.handle();

    let id = event_loop.insert_hook(Recorder::new(Some(pipe.reader), &log));
    event_loop.turn(Some(Duration::ZERO)).unwrap();
    assert_eq!(handle.armed(), 1);

    assert!(event_loop.remove_hook(id).is_some());
    assert_eq!(handle.armed(), 0);
    assert!(!handle.is_armed(pipe.reader));
    assert!(event_loop.remove_hook(id).is_none());
}

#[test]
fn hook_timeout_bounds_poll() {
    let mut event_loop = EventLoop::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut recorder = Recorder::new(None, &log);
    recorder.timeout = Some(Duration::from_millis(20));
    event_loop.insert_hook(recorder);

    let start = Instant::now();
    event_loop.turn(None).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(15));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn arming_same_descriptor_twice_fails() {
    let pipe = Pipe::new();
    let mut event_loop = EventLoop::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    event_loop.insert_hook(Recorder::new(Some(pipe.reader), &log));
    event_loop.insert_hook(Recorder::new(Some(pipe.reader), &log));

    let result = event_loop.turn(Some(Duration::ZERO));

    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(event_loop.handle().armed(), 1);
}

#[test]
fn run_returns_when_nothing_to_wait_for() {
    let mut event_loop = EventLoopBuilder::new().event_capacity(8).build().unwrap();
    event_loop.run().unwrap();
}

#[test]
fn stop_ends_run() {
    let pipe = Pipe::new();
    let mut event_loop = EventLoop::new().unwrap();
    let handle = event_loop.handle();

    struct StopOnReady {
        fd: RawFd,
        watch: Option<Watch>,
        handle: loopbridge::LoopHandle,
    }

    impl Hook for StopOnReady {
        fn before_poll(&mut self, cx: &mut HookContext<'_>) -> loopbridge::Result<Option<Duration>> {
            if self.watch.is_none() {
                self.watch = Some(cx.arm(self.fd, Interest::WRITE, 0)?);
            }
            Ok(None)
        }

        fn on_ready(&mut self, _key: usize, readiness: Readiness) {
            assert!(readiness.writable);
            self.handle.stop();
        }
    }

    event_loop.insert_hook(StopOnReady {
        fd: pipe.writer,
        watch: None,
        handle: handle.clone(),
    });

    event_loop.run().unwrap();

    assert!(!handle.is_stopping(), "stop request is consumed by run");
}

#[test]
#[should_panic(expected = "event_capacity must be > 0")]
fn zero_event_capacity_panics() {
    let _ = EventLoopBuilder::new().event_capacity(0);
}
