use actix_web::{guard, middleware::from_fn, web};

use crate::auth::{handlers as auth, require_identity};
use crate::blog::handlers as blog;

/// Mounts the `/api` tree.
///
/// Reads under `/api/blogs` are public; every other blog route sits in a
/// nested scope behind the identity gate. The public resources are guarded
/// by method so writes to the same paths fall through to the gated scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/user", web::get().to(auth::current_user))
                    .route("/logout", web::post().to(auth::logout)),
            )
            .service(
                web::scope("/blogs")
                    .service(web::resource("").guard(guard::Get()).to(blog::list_posts))
                    .service(web::resource("/{id}").guard(guard::Get()).to(blog::get_post))
                    .service(
                        web::scope("")
                            .wrap(from_fn(require_identity))
                            .route("", web::post().to(blog::create_post))
                            .route("/{id}", web::put().to(blog::update_post))
                            .route("/{id}", web::delete().to(blog::delete_post))
                            .route("/{id}/like", web::post().to(blog::like_post))
                            .route("/{id}/comment", web::post().to(blog::comment_post)),
                    ),
            ),
    );
}
