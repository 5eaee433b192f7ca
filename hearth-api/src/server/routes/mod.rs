use crate::server::ServerRouter;

mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new().merge(posts::routes())
}
