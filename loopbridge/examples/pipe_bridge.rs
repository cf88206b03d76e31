//! Example: driving a MainContext from the loopbridge event loop

use loopbridge::context::{IoCondition, MainContext, PRIORITY_DEFAULT};
use loopbridge::{EventLoop, attach, detach};
use std::ops::ControlFlow;
use std::time::Duration;

fn main() -> loopbridge::Result<()> {
    tracing_subscriber::fmt::init();

    let mut fds = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    let [reader, writer] = fds;

    let mut event_loop = EventLoop::new()?;
    let handle = event_loop.handle();
    let context = MainContext::new();

    // Print whatever arrives on the pipe
    context.add_fd(reader, IoCondition::IN, PRIORITY_DEFAULT, move |_| {
        let mut buf = [0u8; 64];
        let n = unsafe { libc::read(reader, buf.as_mut_ptr() as *mut _, buf.len()) };
        if n <= 0 {
            return ControlFlow::Break(());
        }
        println!("received {:?}", String::from_utf8_lossy(&buf[..n as usize]));
        ControlFlow::Continue(())
    });

    // Write a message every 200ms, five times
    let mut sent = 0;
    context.add_timeout(Duration::from_millis(200), PRIORITY_DEFAULT, move || {
        sent += 1;
        let message = format!("tick {sent}");
        unsafe { libc::write(writer, message.as_ptr() as *const _, message.len()) };
        ControlFlow::Continue(())
    });

    // Stop after one second
    let stop = handle.clone();
    context.add_timeout(Duration::from_millis(1100), PRIORITY_DEFAULT, move || {
        stop.stop();
        ControlFlow::Break(())
    });

    let bridge = attach(&mut event_loop, context)?;
    event_loop.run()?;
    detach(&mut event_loop, bridge);

    println!("watches left armed: {}", handle.armed());

    unsafe {
        libc::close(reader);
        libc::close(writer);
    }

    Ok(())
}
