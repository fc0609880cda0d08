pub mod default;

#[allow(dead_code)]
pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    // Several tests may race to install it, the first one wins.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
