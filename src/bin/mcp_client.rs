use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

type Reader = BufReader<OwnedReadHalf>;
type Writer = OwnedWriteHalf;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║   Hyperliquid MCP Server - Test Client v1.0           ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    // Server must run with MCP_TRANSPORT=tcp
    let addr = std::env::var("MCP_LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    println!("Connecting to server at {}...", addr);

    let socket = TcpStream::connect(&addr).await?;
    let (reader, writer) = socket.into_split();
    let reader = BufReader::new(reader);

    println!("✓ Connected successfully!\n");

    let mut client = TestClient::new(reader, writer);
    client.initialize().await?;

    loop {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ Available Commands:                                   ║");
        println!("║ 1. get_price         - Mid price of a market          ║");
        println!("║ 2. get_order_book    - L2 book snapshot               ║");
        println!("║ 3. get_account_state - Margin summary and positions   ║");
        println!("║ 4. get_open_orders   - Resting orders                 ║");
        println!("║ 5. place_order       - Place a limit/market order     ║");
        println!("║ 6. cancel_order      - Cancel one order               ║");
        println!("║ 7. cancel_all_orders - Cancel every open order        ║");
        println!("║ 8. tools/list        - List available tools           ║");
        println!("║ 9. exit              - Close connection               ║");
        println!("╚═══════════════════════════════════════════════════════╝");

        let choice = prompt("\nEnter command number (1-9): ")?;

        match choice.as_str() {
            "1" => client.get_price().await?,
            "2" => client.get_order_book().await?,
            "3" => client.get_account_state().await?,
            "4" => client.get_open_orders().await?,
            "5" => client.place_order().await?,
            "6" => client.cancel_order().await?,
            "7" => client.cancel_all_orders().await?,
            "8" => client.list_tools().await?,
            "9" => {
                println!("\nGoodbye!");
                break;
            }
            _ => println!("Invalid choice. Please enter 1-9."),
        }
    }

    Ok(())
}

fn prompt(label: &str) -> eyre::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Adds `name` to `args` unless the user left it blank.
fn optional(args: &mut Map<String, Value>, name: &str, label: &str) -> eyre::Result<()> {
    let value = prompt(label)?;
    if !value.is_empty() {
        args.insert(name.to_string(), Value::String(value));
    }
    Ok(())
}

fn banner(title: &str) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║ {:<53} ║", title);
    println!("╚═══════════════════════════════════════════════════════╝");
}

struct TestClient {
    reader: Reader,
    writer: Writer,
    request_id: i32,
}

impl TestClient {
    fn new(reader: Reader, writer: Writer) -> Self {
        TestClient {
            reader,
            writer,
            request_id: 1,
        }
    }

    async fn send_request(&mut self, method: &str, params: Value) -> eyre::Result<()> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.request_id
        });
        let request_json = serde_json::to_string(&request)?;
        println!(
            "\n→ Sending request:\n{}",
            serde_json::to_string_pretty(&request)?
        );

        self.writer.write_all(request_json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        // Read response
        let mut response_line = String::new();
        self.reader.read_line(&mut response_line).await?;

        if !response_line.is_empty() {
            println!("\n← Response received:");
            let response: Value = serde_json::from_str(&response_line)?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if let Some(error) = response.get("error") {
                println!(
                    "\n⚠️  Error: {}",
                    error.get("message").unwrap_or(&Value::Null)
                );
            }
            if let Some(tool_error) = response
                .pointer("/result/structuredContent/error")
                .filter(|e| !e.is_null())
            {
                println!(
                    "\n⚠️  Tool error [{}]: {}",
                    tool_error.get("kind").unwrap_or(&Value::Null),
                    tool_error.get("message").unwrap_or(&Value::Null)
                );
            }
        }

        self.request_id += 1;
        Ok(())
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> eyre::Result<()> {
        self.send_request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    async fn initialize(&mut self) -> eyre::Result<()> {
        self.send_request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "mcp-client", "version": env!("CARGO_PKG_VERSION") }
            }),
        )
        .await
    }

    async fn get_price(&mut self) -> eyre::Result<()> {
        banner("Get Price Tool");

        let mut args = Map::new();
        args.insert("symbol".into(), prompt("\nEnter symbol (e.g., BTC, ETH): ")?.into());
        self.call_tool("get_price", args).await
    }

    async fn get_order_book(&mut self) -> eyre::Result<()> {
        banner("Get Order Book Tool");

        let mut args = Map::new();
        args.insert("symbol".into(), prompt("\nEnter symbol (e.g., BTC): ")?.into());
        optional(&mut args, "depth", "Levels per side (press Enter for 5): ")?;
        self.call_tool("get_order_book", args).await
    }

    async fn get_account_state(&mut self) -> eyre::Result<()> {
        banner("Get Account State Tool");

        let mut args = Map::new();
        optional(
            &mut args,
            "address",
            "\nEnter address (press Enter for the server's account): ",
        )?;
        self.call_tool("get_account_state", args).await
    }

    async fn get_open_orders(&mut self) -> eyre::Result<()> {
        banner("Get Open Orders Tool");

        let mut args = Map::new();
        optional(
            &mut args,
            "address",
            "\nEnter address (press Enter for the server's account): ",
        )?;
        optional(&mut args, "symbol", "Only this market (press Enter for all): ")?;
        self.call_tool("get_open_orders", args).await
    }

    async fn place_order(&mut self) -> eyre::Result<()> {
        banner("Place Order Tool (signed, testnet unless configured)");

        let mut args = Map::new();
        args.insert("symbol".into(), prompt("\nEnter symbol (e.g., BTC): ")?.into());
        args.insert("side".into(), prompt("Enter side (buy/sell): ")?.into());
        args.insert("size".into(), prompt("Enter size: ")?.into());
        optional(
            &mut args,
            "price",
            "Enter limit price (press Enter for a market order): ",
        )?;
        if args.contains_key("price") {
            optional(
                &mut args,
                "time_in_force",
                "Time in force gtc/ioc/alo (press Enter for gtc): ",
            )?;
        }
        if prompt("Reduce only? (y/N): ")?.eq_ignore_ascii_case("y") {
            args.insert("reduce_only".into(), Value::Bool(true));
        }
        self.call_tool("place_order", args).await
    }

    async fn cancel_order(&mut self) -> eyre::Result<()> {
        banner("Cancel Order Tool");

        let mut args = Map::new();
        args.insert("symbol".into(), prompt("\nEnter symbol (e.g., BTC): ")?.into());
        args.insert("order_id".into(), prompt("Enter order id: ")?.into());
        self.call_tool("cancel_order", args).await
    }

    async fn cancel_all_orders(&mut self) -> eyre::Result<()> {
        banner("Cancel All Orders Tool");

        let mut args = Map::new();
        optional(&mut args, "symbol", "\nOnly this market (press Enter for all): ")?;
        self.call_tool("cancel_all_orders", args).await
    }

    async fn list_tools(&mut self) -> eyre::Result<()> {
        banner("Listing Available Tools");
        self.send_request("tools/list", json!({})).await
    }
}
