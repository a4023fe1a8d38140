#[macro_export]
macro_rules! wrapper {
    // Single expression (like a function name or closure)
    ($f:expr) => {{
        $f()
    }};
    ($f:expr, $( $args:expr $(,)? )* ) => {{
        $f( $($args,)* )
    }};
}

/// Retries a fallible call with bounded exponential backoff (2, 4 and 8
/// seconds between attempts), then gives up and yields the last result.
/// Meant for transient failures; conditions that will not clear within
/// seconds belong to the caller, not behind this macro.
#[macro_export]
macro_rules! retry {
    ($( $args:expr$(,)? )+) => {{
        let mut wait: u64 = 2;
        loop {
            let res = wrapper!($( $args, )*);
            if res.is_ok() {
                break res;
            }
            if wait <= 8 {
                thread::sleep(std::time::Duration::from_secs(wait));
                wait *= 2;
                continue;
            }
            break res;
        }
    }};
}
