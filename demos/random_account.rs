//! Demo: Provision a disposable Ethereal mailbox, send to it and read back.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example random_account
//! ```

use lettre::message::header::ContentType;
use mailgrab::{account_last_mail_and_data, create_random_account, FilterCriteria};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = create_random_account().await?;
    println!("Provisioned {}", session.username());

    let message = lettre::Message::builder()
        .from(session.username().parse()?)
        .to(session.username().parse()?)
        .subject("Confirm your address")
        .header(ContentType::TEXT_HTML)
        .body(String::from(
            r#"<p>Click <a class="confirm" href="https://example.com/c/42">confirm</a></p>"#,
        ))?;

    let response = session.send_mail(message).await?;
    println!("Server answered {}", response.code());

    let filter = FilterCriteria::new().subject("Confirm your address");

    for attempt in 1..=10 {
        if let Some(found) = account_last_mail_and_data(&mut session, &filter, "a.confirm").await? {
            println!("Link text: {}", found.data);
            return Ok(());
        }
        println!("Attempt {attempt}: not delivered yet");
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    println!("Message never arrived");
    Ok(())
}
