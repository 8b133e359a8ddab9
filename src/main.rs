#[rocket::main]
async fn main() -> Result<(), tcg_hub::Error> {
    tcg_hub::run().await
}
