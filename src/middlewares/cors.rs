use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        // 只监听本机，任何前端都可以调用
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
