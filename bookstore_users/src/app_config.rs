use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(web::resource("/signup").route(web::post().to(handlers::signup)))
        .service(web::resource("/login").route(web::post().to(handlers::login)))
        .service(web::resource("/users").route(web::get().to(handlers::list_users)))
        .service(web::resource("/user/{user_id}").route(web::delete().to(handlers::delete_user)));
}
