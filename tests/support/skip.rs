/// Skip a test if gpg is not on PATH.
#[macro_export]
macro_rules! skip_without_gpg {
    () => {
        if which::which("gpg").is_err() {
            eprintln!("SKIPPED: gpg not found on PATH");
            return;
        }
    };
}
