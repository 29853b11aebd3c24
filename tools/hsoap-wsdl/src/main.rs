// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hsoap-wsdl: inspect WSDL documents and encode/decode SOAP envelopes.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hsoap::codec::SoapBindingCodec;
use hsoap::config::Features;
use hsoap::wsdl::{FileResolver, Mode, ParameterBinding, PartDescriptor, Style, WsdlModel, WsdlParser};
use hsoap::{ContentNegotiation, Message, Packet, SoapVersion};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hsoap-wsdl")]
#[command(about = "WSDL inspector and SOAP envelope codec")]
#[command(version)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print services, ports, bindings and operations of a WSDL document
    Inspect {
        /// WSDL file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Decode an encoded SOAP message and print its payload and attachments
    Decode {
        /// Encoded message (XML, Fast Infoset, MTOM or SwA)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Transport Content-Type of the message
        #[arg(short = 't', long, default_value = "text/xml; charset=utf-8")]
        content_type: String,

        /// Content negotiation mode (none, pessimistic, optimistic)
        #[arg(long, default_value = "optimistic")]
        negotiation: ContentNegotiation,

        /// Decode as SOAP 1.2
        #[arg(long)]
        soap12: bool,
    },

    /// Wrap a payload element into an envelope and encode it
    Encode {
        /// Payload XML (a single element)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Build a SOAP 1.2 envelope
        #[arg(long)]
        soap12: bool,

        /// Encode as Fast Infoset
        #[arg(long)]
        fast_infoset: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Inspect { input } => cmd_inspect(&input),
        Commands::Decode {
            input,
            content_type,
            negotiation,
            soap12,
        } => cmd_decode(&input, &content_type, negotiation, version(soap12)),
        Commands::Encode {
            input,
            output,
            soap12,
            fast_infoset,
        } => cmd_encode(&input, output.as_deref(), version(soap12), fast_infoset),
    }
}

fn version(soap12: bool) -> SoapVersion {
    if soap12 {
        SoapVersion::Soap12
    } else {
        SoapVersion::Soap11
    }
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(input: &Path) -> anyhow::Result<()> {
    let root = input.parent().unwrap_or_else(|| Path::new("."));
    let location = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("WSDL path has no file name")?;
    let model = WsdlParser::new()
        .with_resolver(FileResolver::with_root(root))
        .parse_location(location)
        .with_context(|| format!("cannot parse {}", input.display()))?;
    log::debug!("[hsoap-wsdl] parsed {}", input.display());

    print_services(&model);
    println!();
    print_bindings(&model);
    Ok(())
}

fn print_services(model: &WsdlModel) {
    println!("Services:");
    if model.services().is_empty() {
        println!("  (none)");
    }
    for service in model.services() {
        println!("  {}", service.name());
        for port in service.ports() {
            println!("    port {}", port.name().local_part());
            println!("      binding:    {}", port.binding_name());
            println!("      address:    {}", port.address().unwrap_or("-"));
            if let Some(required) = port.addressing() {
                println!("      addressing: {}", if required { "required" } else { "enabled" });
            }
        }
    }
}

fn print_bindings(model: &WsdlModel) {
    println!("Bindings:");
    for binding in model.bindings() {
        let version = binding
            .soap_version()
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "  {} ({}, {}, {})",
            binding.name(),
            binding.port_type_name().local_part(),
            version,
            style_name(binding.style())
        );
        for op in binding.operations() {
            let style = op.style().unwrap_or(binding.style());
            let kind = if op.is_one_way() { "one-way" } else { "request-response" };
            println!("    {} [{}, {}]", op.name().local_part(), style_name(style), kind);
            if !op.soap_action().is_empty() {
                println!("      soapAction: {}", op.soap_action());
            }
            print_message(model, "in ", op.input_message(), |part| op.input_binding(part));
            print_message(model, "out", op.output_message(), |part| op.output_binding(part));
            if binding.is_rpc_lit() {
                println!("      body order: in={:?} out={:?}", op.body_parts(Mode::In), op.body_parts(Mode::Out));
            }
        }
    }
}

fn print_message(
    model: &WsdlModel,
    label: &str,
    name: Option<&hsoap::QName>,
    binding_of: impl Fn(&str) -> ParameterBinding,
) {
    let Some(name) = name else {
        return;
    };
    println!("      {} {}", label, name.local_part());
    let Some(message) = model.message(name) else {
        return;
    };
    for part in message.parts() {
        let schema = match part.descriptor() {
            Some(PartDescriptor::Element(q)) => format!("element {}", q),
            Some(PartDescriptor::Type(q)) => format!("type {}", q),
            None => "-".to_string(),
        };
        let index = part.index().map_or_else(String::new, |i| format!(" #{}", i));
        println!(
            "        {}{}: {} ({})",
            part.name(),
            index,
            schema,
            binding_name(&binding_of(part.name()))
        );
    }
}

fn style_name(style: Style) -> &'static str {
    match style {
        Style::Document => "document",
        Style::Rpc => "rpc",
    }
}

fn binding_name(binding: &ParameterBinding) -> String {
    match binding {
        ParameterBinding::Body => "body".to_string(),
        ParameterBinding::Header => "header".to_string(),
        ParameterBinding::Unbound => "unbound".to_string(),
        ParameterBinding::Attachment(types) => format!("attachment {}", types.join(",")),
    }
}

// ============================================================================
// decode / encode
// ============================================================================

fn cmd_decode(
    input: &Path,
    content_type: &str,
    negotiation: ContentNegotiation,
    version: SoapVersion,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("cannot read {}", input.display()))?;
    let mut codec = SoapBindingCodec::new(version, Features::new());
    let mut packet = Packet::new();
    packet.content_negotiation = Some(negotiation);
    codec
        .decode_buffer(&bytes, Some(content_type), &mut packet)
        .with_context(|| format!("cannot decode {}", input.display()))?;

    let Some(message) = packet.message else {
        bail!("{} decoded to an empty packet", input.display());
    };
    log::info!("[hsoap-wsdl] decoded {} bytes from {}", bytes.len(), input.display());

    for header in message.headers() {
        let mu = if header.must_understand { " (mustUnderstand)" } else { "" };
        println!("header: {}{}", header.name, mu);
    }
    match message.payload() {
        Some(payload) => println!("{}", payload.content),
        None => println!("(empty body)"),
    }
    for attachment in message.attachments() {
        println!(
            "attachment: <{}> {} ({} bytes)",
            attachment.content_id,
            attachment.content_type,
            attachment.data.len()
        );
    }
    Ok(())
}

fn cmd_encode(input: &Path, output: Option<&Path>, version: SoapVersion, fast_infoset: bool) -> anyhow::Result<()> {
    let payload = std::fs::read_to_string(input).with_context(|| format!("cannot read {}", input.display()))?;
    let message = Message::with_payload(version, payload.trim())
        .with_context(|| format!("{} is not a single XML element", input.display()))?;

    let mut codec = SoapBindingCodec::new(version, Features::new().fast_infoset(fast_infoset));
    let mut packet = Packet::with_message(message);
    if fast_infoset {
        packet.content_negotiation = Some(ContentNegotiation::Optimistic);
    }
    let mut out = Vec::new();
    let content_type = codec.encode(&mut packet, &mut out)?;
    eprintln!("Content-Type: {}", content_type);

    match output {
        Some(path) => {
            std::fs::write(path, &out).with_context(|| format!("cannot write {}", path.display()))?;
            println!("[OK] {} bytes written to {}", out.len(), path.display());
        }
        None => std::io::stdout().write_all(&out)?,
    }
    Ok(())
}
