pub mod admin;
pub mod document;

pub use admin::MongoAdmin;

#[cfg(test)]
mod test {
    use tracing::Level;

    use replset_core::ext::init_logger;

    #[ctor::ctor]
    fn init() {
        init_logger(Level::DEBUG)
    }
}
