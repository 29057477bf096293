#[rocket::launch]
fn rocket() -> _ {
    inbox_insights::rocket()
}
